// Handlers by access tier:
// public (no token) → protected (token + route permission) → elevated (administrator)
pub mod elevated;
pub mod protected;
pub mod public;
