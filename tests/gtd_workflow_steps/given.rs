//! Given steps for capture and clarify BDD scenarios.

use super::world::OrganizerWorld;
use clarify::organizer::domain::NewContext;
use eyre::WrapErr;
use rstest_bdd_macros::given;

#[given("an organizer with starter data")]
fn organizer_with_starter_data(world: &mut OrganizerWorld) -> Result<(), eyre::Report> {
    world.open()
}

#[given(r#"a context named "{name}""#)]
fn context_named(world: &mut OrganizerWorld, name: String) -> Result<(), eyre::Report> {
    world
        .store()?
        .add_context(NewContext::new(name))
        .wrap_err("add context in scenario setup")?;
    Ok(())
}

#[given(r#"a captured task "{title}""#)]
fn captured_task(world: &mut OrganizerWorld, title: String) -> Result<(), eyre::Report> {
    world
        .store()?
        .capture(title, None)
        .wrap_err("capture task in scenario setup")?;
    Ok(())
}

#[given(r#""{title}" is processed into context "{context}""#)]
fn processed_into_context(
    world: &mut OrganizerWorld,
    title: String,
    context: String,
) -> Result<(), eyre::Report> {
    let task = world.task_named(&title)?;
    let context_id = world.context_named(&context)?;
    world
        .store()?
        .process_into_context(task.id(), context_id)
        .wrap_err("process task in scenario setup")?;
    Ok(())
}
