//! Tree-select formatting for the client-side role picker.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::role::entity::Role;

/// `{label, value, key}` node consumed by the tree selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TreeNode {
    pub label: String,
    pub value: i64,
    pub key: i64,
}

impl From<&Role> for TreeNode {
    fn from(role: &Role) -> Self {
        Self {
            label: role.name.clone(),
            value: role.id,
            key: role.id,
        }
    }
}

/// One node per role, in input order.
pub fn format_to_tree<'a, I>(roles: I) -> Vec<TreeNode>
where
    I: IntoIterator<Item = &'a Role>,
{
    roles.into_iter().map(TreeNode::from).collect()
}
