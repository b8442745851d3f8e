pub mod role_based;

pub use role_based::RoleBasedPermissions;
