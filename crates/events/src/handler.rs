/// Execute an aggregate command in place: decide, then apply each event.
///
/// No persistence and no publication; the infra dispatcher does those. Handy
/// for tests and for building up aggregate state step by step.
pub fn execute<A>(aggregate: &mut A, command: &A::Command) -> Result<Vec<A::Event>, A::Error>
where
    A: invenhub_core::Aggregate,
{
    let events = A::handle(aggregate, command)?;
    for ev in &events {
        A::apply(aggregate, ev);
    }
    Ok(events)
}
