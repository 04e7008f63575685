use huntdraw_compiler::TaskChainDefinition;

/// Check a task-chain definition and list every problem found.
///
/// An empty list means the definition is runnable.
pub fn check_definition(definition: &TaskChainDefinition) -> Vec<String> {
  let mut problems = Vec::new();

  if definition.is_empty() {
    problems.push("definition has no tasks".to_string());
    return problems;
  }

  if !definition.tasks.contains_key(&definition.start_node_id) {
    problems.push(format!(
      "start task '{}' does not exist",
      definition.start_node_id
    ));
  }

  let mut terminals = 0;
  for (id, task) in &definition.tasks {
    if task.resource_ref.trim().is_empty() {
      problems.push(format!("task '{}' has no resource", id));
    }
    match (&task.next, task.terminal) {
      (Some(_), true) => problems.push(format!("terminal task '{}' has a next task", id)),
      (None, false) => problems.push(format!("task '{}' has neither a next task nor an end", id)),
      (Some(next), false) if !definition.tasks.contains_key(next) => {
        problems.push(format!("task '{}' points at missing task '{}'", id, next))
      }
      _ => {}
    }
    if task.terminal {
      terminals += 1;
    }
  }

  if terminals != 1 {
    problems.push(format!(
      "expected exactly one terminal task, found {}",
      terminals
    ));
  }

  let reachable = definition.chain().count();
  if problems.is_empty() && reachable != definition.len() {
    problems.push(format!(
      "{} task(s) are not reachable from the start task",
      definition.len() - reachable
    ));
  }

  problems
}
