// handlers/mod.rs - two security tiers
//
// Public (no auth) → Protected (JWT + organization + user validation)

pub mod extract;
pub mod protected; // /api/*
pub mod public; // /, /health, /auth/*

pub use extract::JsonBody;
