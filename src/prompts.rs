//! Instruction messages sent to Claude at the start of each agent phase.

use crate::db::AgentType;

pub fn planification_message(doc_path: &str, task_id: i64) -> String {
    format!(
        "You are the planning agent for task #{task_id}.\n\n\
         Read the task description in `{doc_path}` and explore the repository to understand \
         the code it touches. Then rewrite `{doc_path}` with:\n\
         1. A short summary of the goal.\n\
         2. The files and modules that need to change.\n\
         3. A numbered, checkable implementation plan (`- [ ]` items).\n\
         4. How the change should be tested.\n\n\
         Do not modify any source code in this phase."
    )
}

pub fn implementation_message(doc_path: &str, task_id: i64) -> String {
    format!(
        "You are the implementation agent for task #{task_id}.\n\n\
         Read `{doc_path}` for the plan and any review feedback. Implement the next unchecked \
         items, run the relevant tests, and tick off (`- [x]`) what you finished. If a review \
         section lists problems, address those first.\n\n\
         Record what you changed and anything left open in a `## Progress` section of \
         `{doc_path}` before you stop."
    )
}

pub fn review_message(doc_path: &str, task_id: i64) -> String {
    format!(
        "You are the review agent for task #{task_id}.\n\n\
         Read `{doc_path}` and review the changes made so far: check them against the plan, \
         run the tests, and look for bugs, missing cases and regressions.\n\n\
         Write your findings to a `## Review` section of `{doc_path}`. If everything in the plan \
         is done and correct, say so explicitly and write `WORKFLOW COMPLETE` on its own line so \
         the task can be closed; otherwise list the fixes the implementation agent must make."
    )
}

/// Message for the given phase.
pub fn message_for(agent_type: AgentType, doc_path: &str, task_id: i64) -> String {
    match agent_type {
        AgentType::Planification => planification_message(doc_path, task_id),
        AgentType::Implementation => implementation_message(doc_path, task_id),
        AgentType::Review => review_message(doc_path, task_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_reference_doc_and_task() {
        let path = ".claude-ui/tasks/task-4.md";
        for agent_type in AgentType::ALL {
            let message = message_for(agent_type, path, 4);
            assert!(message.contains(path), "{agent_type} message lacks doc path");
            assert!(message.contains("task #4"), "{agent_type} message lacks task id");
        }
    }

    #[test]
    fn test_each_phase_has_its_own_instructions() {
        let path = "doc.md";
        assert!(message_for(AgentType::Planification, path, 1).contains("planning agent"));
        assert!(message_for(AgentType::Implementation, path, 1).contains("implementation agent"));
        assert!(message_for(AgentType::Review, path, 1).contains("review agent"));
    }
}
