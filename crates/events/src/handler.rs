/// Decide then evolve: run `handle` and apply every resulting event.
///
/// When `handle` rejects the command nothing is applied, so the aggregate is
/// left untouched. Callers that must not expose partial state run this on a
/// clone and swap it in afterwards.
pub fn execute<A>(aggregate: &mut A, command: &A::Command) -> Result<Vec<A::Event>, A::Error>
where
    A: eventrent_core::Aggregate,
{
    let events = A::handle(aggregate, command)?;
    for ev in &events {
        A::apply(aggregate, ev);
    }
    Ok(events)
}
