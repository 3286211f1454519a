use crate::models::task::Task;

pub fn render_task(task: &Task) -> String {
    let mut line = format!(
        "{:<28} {:<24} Status: {}",
        task.id.as_str(),
        task.filename,
        task.status
    );
    if task.retries > 0 {
        line.push_str(&format!(" (Retry {})", task.retries));
    }
    if task.status.is_cancelable() {
        line.push_str(&format!("  [cancel {}]", task.id));
    }
    line
}

pub fn render_task_list(tasks: &[Task]) -> Vec<String> {
    if tasks.is_empty() {
        return vec!["No tasks yet.".to_string()];
    }
    tasks.iter().map(render_task).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{TaskId, TaskStatus};

    fn task(status: TaskStatus, retries: u32) -> Task {
        Task {
            id: TaskId::from("task_1"),
            filename: "scan.pdf".into(),
            status,
            retries,
        }
    }

    #[test]
    fn empty_list() {
        assert_eq!(render_task_list(&[]), ["No tasks yet."]);
    }

    #[test]
    fn active_task_offers_cancel() {
        let line = render_task(&task(TaskStatus::Pending, 0));
        assert!(line.contains("Status: pending"));
        assert!(line.ends_with("[cancel task_1]"));
        assert!(!line.contains("Retry"));
    }

    #[test]
    fn failed_task_keeps_retry_count() {
        let line = render_task(&task(TaskStatus::Failed, 3));
        assert!(line.ends_with("Status: failed (Retry 3)"));
    }
}
