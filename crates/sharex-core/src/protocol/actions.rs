//! Action names understood by the host, and the request kinds they map to.

/// Prefix shared by every document-store action.
pub const STORE_ACTION_PREFIX: &str = "db_action_";

/// Client to host actions.
pub mod outbound {
    pub const INIT_USER: &str = "init_user";
    pub const UPDATE_USER_DATA: &str = "update_user_data";
    pub const GET_ALL_USERS: &str = "get_all_users";
    pub const SEND_MSG: &str = "send_msg";
    pub const GET_PUBLIC_DATA_OF_USER: &str = "get_public_data_of_user";
    pub const CREATE_JSON_FILE: &str = "create_json_file";
    pub const READ_JSON_FILE: &str = "read_json_file";

    pub const DB_INIT: &str = "db_action_init_db";
    pub const DB_INSERT: &str = "db_action_insert_data";
    pub const DB_INSERT_BULK: &str = "db_action_insert_data_bulk";
    pub const DB_GET_ALL: &str = "db_action_get_all_data";
    pub const DB_GET: &str = "db_action_get_data";
    pub const DB_UPDATE: &str = "db_action_update_data";
    pub const DB_DELETE: &str = "db_action_delete_data";
}

/// Host to client actions.
pub mod inbound {
    pub const RETURN_ALL_USERS: &str = "return_all_users";
    pub const USER_ARRIVE: &str = "user_arrive";
    pub const USER_LEFT: &str = "user_left";
    pub const MSG_ARRIVE: &str = "msg_arrive";
    pub const RETURN_PUBLIC_DATA_OF_USER: &str = "return_public_data_of_user";
    pub const RETURN_CREATE_JSON_FILE: &str = "return_create_json_file";
    pub const RETURN_READ_JSON_FILE: &str = "return_read_json_file";
}

/// Store results, compared after [`STORE_ACTION_PREFIX`] is stripped.
pub mod store_results {
    pub const INIT_DB: &str = "init_db_result";
    pub const INSERT_DATA: &str = "insert_data_result";
    pub const GET_ALL_DATA: &str = "get_all_data_result";
    pub const GET_DATA: &str = "get_data_result";
    pub const UPDATE_DATA: &str = "update_data_result";
    pub const DELETE_DATA: &str = "delete_data_result";
}

/// Request kinds answered by the host itself (presence and file I/O).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SdkRequestKind {
    /// `get_all_users` / `return_all_users`
    AllUsers,
    /// `get_public_data_of_user` / `return_public_data_of_user`
    PublicData,
    /// `create_json_file` / `return_create_json_file`
    CreateFile,
    /// `read_json_file` / `return_read_json_file`
    ReadFile,
}

impl SdkRequestKind {
    /// Map an inbound action to the request kind it resolves.
    pub fn from_result_action(action: &str) -> Option<Self> {
        match action {
            inbound::RETURN_ALL_USERS => Some(Self::AllUsers),
            inbound::RETURN_PUBLIC_DATA_OF_USER => Some(Self::PublicData),
            inbound::RETURN_CREATE_JSON_FILE => Some(Self::CreateFile),
            inbound::RETURN_READ_JSON_FILE => Some(Self::ReadFile),
            _ => None,
        }
    }

    /// Outbound action that starts a request of this kind.
    pub fn request_action(self) -> &'static str {
        match self {
            Self::AllUsers => outbound::GET_ALL_USERS,
            Self::PublicData => outbound::GET_PUBLIC_DATA_OF_USER,
            Self::CreateFile => outbound::CREATE_JSON_FILE,
            Self::ReadFile => outbound::READ_JSON_FILE,
        }
    }
}

/// Request kinds answered by the host's document store.
///
/// Each kind has its own pending slot: a find in flight does not block an
/// insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreRequestKind {
    Insert,
    Find,
    Update,
    Delete,
}

impl StoreRequestKind {
    /// Map a prefix-stripped store result action to its request kind.
    pub fn from_result_action(action: &str) -> Option<Self> {
        match action {
            store_results::INSERT_DATA => Some(Self::Insert),
            store_results::GET_ALL_DATA | store_results::GET_DATA => Some(Self::Find),
            store_results::UPDATE_DATA => Some(Self::Update),
            store_results::DELETE_DATA => Some(Self::Delete),
            _ => None,
        }
    }
}
