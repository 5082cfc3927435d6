// handlers/protected - endpoints behind the token
//
// Security Level: JWT + active organization + active user with matching role
// Route Prefix: /api/*
// Handlers receive `ValidatedUser` and `OrganizationContext` as request extensions.

pub mod activity;
pub mod auth;
pub mod dashboard;
pub mod data;
pub mod find;
pub mod notifications;
pub mod organization;
pub mod users;
