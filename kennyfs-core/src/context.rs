/// Per-operation ambient state passed to backend operations: the caller's
/// uid/gid. Constructed fresh per handler invocation, never persisted
/// between operations — there is deliberately no "brick-private state
/// pointer" field here, because in safe Rust that role is played by `&self`
/// on the `Backend` implementation the handler already holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Context {
    pub uid: u32,
    pub gid: u32,
}
