// Plumbing shared by both entry points: argument checks, the per-call
// workspace, the delimited-text codec and the engine contract.

pub mod engine;
pub mod files;
pub mod validate;
pub mod workspace;
