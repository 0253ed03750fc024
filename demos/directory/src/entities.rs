use rowbind::Entity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Entity)]
pub struct User {
    #[serde(rename = "id")]
    #[rowbind(column = "id", primary_key)]
    pub user_id: i64,

    #[rowbind(column = "first_name")]
    pub first_name: String,

    #[rowbind(column = "email")]
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[rowbind(relation = "id in (select role_id from user_roles where user_id = ?)")]
    pub roles: Option<Vec<Role>>,

    /// Hidden from clients; writes take `my_group.id` when the group is loaded
    #[serde(skip)]
    #[rowbind(column = "group_id", reference = "my_group.id")]
    pub group_id: Option<i64>,

    #[serde(rename = "group", default, skip_serializing_if = "Option::is_none")]
    #[rowbind(relation = "id = ?", params = "group_id")]
    pub my_group: Option<Box<Group>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Entity)]
pub struct Role {
    #[rowbind(column = "id", table = "roles")]
    pub id: i64,

    #[rowbind(column = "name")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[rowbind(relation = "id in (select user_id from user_roles where role_id = ?)")]
    pub users: Option<Vec<User>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Entity)]
pub struct Group {
    #[rowbind(column = "id", table = "groups")]
    pub id: i64,

    #[rowbind(column = "name")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[rowbind(relation = "group_id = ?")]
    pub users: Option<Vec<User>>,
}

/// Link row between users and roles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Entity)]
#[rowbind(table = "user_roles", depth = 1)]
pub struct UserRole {
    #[rowbind(column = "id")]
    pub id: i64,

    #[rowbind(column = "user_id")]
    pub user_id: i64,

    #[rowbind(column = "role_id")]
    pub role_id: i64,
}
