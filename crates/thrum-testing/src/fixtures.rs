use crate::world::TestWorld;

/// A small standing roster used by most multi-agent scenario tests: a human
/// operator and two worker agents on different modules, all with active
/// sessions.
pub struct Roster {
    pub operator_session: String,
    pub worker_a_session: String,
    pub worker_b_session: String,
}

/// Registers and starts sessions for the standard three-agent roster
/// (`operator`, `worker_a`, `worker_b`) against `world`.
pub async fn standard_roster(world: &TestWorld) -> Roster {
    let operator_session = world.active_session("operator", "operator", "core").await;
    let worker_a_session = world.active_session("worker_a", "worker", "frontend").await;
    let worker_b_session = world.active_session("worker_b", "worker", "backend").await;
    Roster {
        operator_session,
        worker_a_session,
        worker_b_session,
    }
}
