//! Built-in rule lists for the two guarded domains.
//!
//! Monday.com is reached through its MCP server (GraphQL underneath); tool
//! names arrive as `mcp_monday-mcp_<tool>` or bare. Slack is reached through
//! Web API method names (`family.method`).

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    classifier::{Classifier, RuleLists},
    error::RuleSetError,
};

/// An external service guarded by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Work-board GraphQL API.
    Monday,
    /// Team-messaging REST API.
    Slack,
}

impl Domain {
    pub const ALL: [Domain; 2] = [Domain::Monday, Domain::Slack];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monday => "monday",
            Self::Slack => "slack",
        }
    }

    /// Whether raw query documents may be submitted to this domain.
    pub fn accepts_query_documents(self) -> bool {
        matches!(self, Self::Monday)
    }

    pub fn rule_lists(self) -> RuleLists<'static> {
        match self {
            Self::Monday => RuleLists {
                namespaces: MONDAY_NAMESPACES,
                whitelist: MONDAY_READ_OPERATIONS,
                blacklist: MONDAY_WRITE_OPERATIONS,
                keywords: MONDAY_WRITE_KEYWORDS,
                read_prefixes: MONDAY_READ_PREFIXES,
            },
            Self::Slack => RuleLists {
                namespaces: &[],
                whitelist: SLACK_READ_OPERATIONS,
                blacklist: SLACK_WRITE_OPERATIONS,
                keywords: SLACK_WRITE_KEYWORDS,
                read_prefixes: SLACK_READ_PREFIXES,
            },
        }
    }

    /// Build this domain's classifier from the built-in lists.
    pub fn classifier(self) -> Result<Classifier, RuleSetError> {
        Classifier::new(self.as_str(), self.rule_lists())
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monday" => Ok(Self::Monday),
            "slack" => Ok(Self::Slack),
            other => Err(format!("unknown domain '{other}' (expected monday or slack)")),
        }
    }
}

const MONDAY_NAMESPACES: &[&str] = &["mcp_monday-mcp_", "mcp_"];

const MONDAY_READ_OPERATIONS: &[&str] = &[
    // boards
    "get_board_info",
    "get_board_items_page",
    "get_board_activity",
    "board_insights",
    "get_boards",
    "get_board",
    "get_boards_by_id",
    // items
    "get_items",
    "get_item",
    "get_items_by_id",
    "get_item_details",
    "get_board_items",
    // columns and groups
    "get_columns",
    "get_column",
    "get_groups",
    "get_group",
    // search and listing
    "search",
    "list",
    "list_workspaces",
    "workspace_info",
    "list_users_and_teams",
    "list_boards",
    "list_items",
    "list_users",
    // users and teams
    "get_users",
    "get_user",
    "get_teams",
    "get_team",
    "get_me",
    "get_workspaces",
    "get_workspace",
    "get_tags",
    "get_tag",
    "get_webhooks",
    "get_webhook",
    "get_activity_logs",
    "get_complexity",
    // docs and schema
    "read_docs",
    "get_form",
    "get_graphql_schema",
    "get_type_details",
    "get_column_type_info",
    // monday dev sprints
    "get_monday_dev_sprints_boards",
    "get_sprints_metadata",
    "get_sprint_summary",
    // generic verbs
    "query",
    "read",
    "fetch",
    "retrieve",
];

const MONDAY_WRITE_OPERATIONS: &[&str] = &[
    "create_item",
    "change_item_column_values",
    "delete_item",
    "archive_item",
    "duplicate_item",
    "create_board",
    "create_column",
    "create_group",
    "duplicate_board",
    "delete_board",
    "create_update",
    "delete_update",
    "create_form",
    "update_form",
    "form_questions_editor",
    "create_workspace",
    "update_workspace",
    "create_doc",
    "create_dashboard",
    "create_widget",
    "create_folder",
    "update_folder",
    "move_object",
];

const MONDAY_WRITE_KEYWORDS: &[&str] = &[
    "create",
    "update",
    "delete",
    "remove",
    "add",
    "modify",
    "change",
    "set",
    "post",
    "put",
    "patch",
    "mutate",
    "insert",
    "edit",
    "archive",
    "duplicate",
    "move",
    "copy",
];

const MONDAY_READ_PREFIXES: &[&str] = &[
    "get_",
    "list_",
    "read_",
    "search_",
    "fetch_",
    "query_",
    "retrieve_",
];

const SLACK_READ_OPERATIONS: &[&str] = &[
    "conversations.list",
    "conversations.history",
    "conversations.info",
    "conversations.members",
    "conversations.replies",
    "users.list",
    "users.info",
    "users.conversations",
    "users.getPresence",
    "users.profile.get",
    "channels.list",
    "channels.history",
    "channels.info",
    "channels.members",
    "search.messages",
    "search.files",
    "search.all",
    "files.info",
    "files.list",
    "reactions.get",
    "reactions.list",
    "pins.list",
    "reminders.list",
    "reminders.info",
    "team.info",
    "team.accessLogs",
    "team.billableInfo",
    "auth.test",
    // generic verbs
    "get",
    "list",
    "read",
    "search",
    "fetch",
    "query",
    "retrieve",
    "info",
    "history",
];

const SLACK_WRITE_OPERATIONS: &[&str] = &[
    "chat.postMessage",
    "chat.postEphemeral",
    "chat.update",
    "chat.delete",
    "chat.scheduleMessage",
    "chat.deleteScheduledMessage",
    "chat.meMessage",
    "chat.unfurl",
    "chat.getPermalink",
    "conversations.open",
    "files.upload",
    "files.delete",
    "files.sharedPublicURL",
    "files.comments.add",
    "files.comments.delete",
    "files.comments.edit",
    "files.remote.add",
    "files.remote.remove",
    "files.remote.info",
    "files.remote.list",
    "files.remote.share",
    "files.remote.update",
    "channels.create",
    "channels.archive",
    "channels.unarchive",
    "channels.join",
    "channels.leave",
    "channels.invite",
    "channels.kick",
    "channels.rename",
    "channels.setTopic",
    "channels.setPurpose",
    "channels.mark",
    "conversations.create",
    "conversations.archive",
    "conversations.unarchive",
    "conversations.join",
    "conversations.leave",
    "conversations.invite",
    "conversations.kick",
    "conversations.rename",
    "conversations.setTopic",
    "conversations.setPurpose",
    "conversations.mark",
    "conversations.close",
    "users.admin.invite",
    "users.admin.setInactive",
    "users.admin.setRegular",
    "users.admin.setOwner",
    "users.setActive",
    "users.setPresence",
    "users.setPhoto",
    "users.deletePhoto",
    "users.profile.set",
    "pins.add",
    "pins.remove",
    "reactions.add",
    "reactions.remove",
    "reminders.add",
    "reminders.complete",
    "reminders.delete",
    "team.preferences.set",
    "workflows.stepCompleted",
    "workflows.updateStep",
    "admin.apps.approve",
    "admin.apps.restrict",
    "admin.apps.requests.list",
    "admin.apps.requests.approve",
    "admin.apps.requests.cancel",
    "admin.conversations.restrictAccess",
    "admin.conversations.setTeams",
    "admin.conversations.whitelist",
    "admin.inviteRequests.approve",
    "admin.inviteRequests.deny",
    "admin.teams.create",
    "admin.teams.list",
    "admin.teams.settings.info",
    "admin.teams.settings.setDefaultChannels",
    "admin.teams.settings.setDescription",
    "admin.teams.settings.setIcon",
    "admin.teams.settings.setName",
    "admin.usergroups.addChannels",
    "admin.usergroups.addTeams",
    "admin.usergroups.removeChannels",
    "admin.usergroups.removeTeams",
    "admin.users.assign",
    "admin.users.invite",
    "admin.users.remove",
    "admin.users.session.reset",
    "admin.users.setAdmin",
    "admin.users.setExpiration",
    "admin.users.setOwner",
    "admin.users.setRegular",
];

const SLACK_WRITE_KEYWORDS: &[&str] = &[
    "post",
    "send",
    "create",
    "update",
    "delete",
    "remove",
    "archive",
    "join",
    "leave",
    "invite",
    "kick",
    "set",
    "rename",
    "add",
    "upload",
    "modify",
    "edit",
    "complete",
    "approve",
    "deny",
    "restrict",
    "assign",
    "reset",
    "admin",
];

const SLACK_READ_PREFIXES: &[&str] = &[
    "get", "list", "read", "search", "fetch", "query", "info", "history", "replies", "members",
];
