//! Permission resolution for live snippet execution.
//!
//! An advisor answers which scopes allow a request. [`HttpPermissionAdvisor`] asks
//! the advisory service; [`DocTablePermissionAdvisor`] reads the permission table on
//! the snippet's documentation page. Both map names to full [`Scope`]s through the
//! [`PermissionCatalog`] when one is loaded.
//!
//! [`Scope`]: docsnip_core::Scope

pub mod advisor;
pub mod catalog;
pub mod table;

pub use advisor::{HttpPermissionAdvisor, PermissionAdvisor, PermissionQuery};
pub use catalog::PermissionCatalog;
pub use table::{DocTablePermissionAdvisor, PermissionTable};
