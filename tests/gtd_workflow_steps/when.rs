//! When steps for capture and clarify BDD scenarios.

use super::world::{OrganizerWorld, run_async};
use clarify::organizer::domain::NewProject;
use eyre::WrapErr;
use rstest_bdd_macros::when;

#[when(r#"I capture "{title}""#)]
fn capture(world: &mut OrganizerWorld, title: String) -> Result<(), eyre::Report> {
    world.store()?.capture(title, None).wrap_err("capture task")?;
    Ok(())
}

#[when(r#"I process "{title}" into context "{context}""#)]
fn process_into_context(
    world: &mut OrganizerWorld,
    title: String,
    context: String,
) -> Result<(), eyre::Report> {
    let task = world.task_named(&title)?;
    let context_id = world.context_named(&context)?;
    world
        .store()?
        .process_into_context(task.id(), context_id)
        .wrap_err("process task into context")?;
    Ok(())
}

#[when(r#"I create project "{name}" for "{title}""#)]
fn create_project_for(
    world: &mut OrganizerWorld,
    name: String,
    title: String,
) -> Result<(), eyre::Report> {
    let task = world.task_named(&title)?;
    world
        .store()?
        .create_project_for_task(task.id(), NewProject::new(name))
        .wrap_err("create project for task")?;
    Ok(())
}

#[when(r#"I delete context "{name}""#)]
fn delete_context(world: &mut OrganizerWorld, name: String) -> Result<(), eyre::Report> {
    let context_id = world.context_named(&name)?;
    world
        .store()?
        .delete_context(&context_id)
        .wrap_err("delete context")?;
    Ok(())
}

#[when(r#"I toggle completion of "{title}""#)]
fn toggle_completion(world: &mut OrganizerWorld, title: String) -> Result<(), eyre::Report> {
    let task = world.task_named(&title)?;
    world
        .store()?
        .toggle_completion(task.id())
        .wrap_err("toggle completion")?;
    Ok(())
}

#[when("the organizer restarts")]
fn organizer_restarts(world: &mut OrganizerWorld) -> Result<(), eyre::Report> {
    run_async(world.store()?.flush()).wrap_err("flush before restart")?;
    world.open()
}
