use std::{
    io::{self, Write},
    path::Path,
    thread,
    time::Duration,
};

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute, terminal,
};

use crate::app::render::{render_task, render_task_list};
use crate::app::upload::validate_file;
use crate::error::Result;
use crate::manager::task_manager::TaskManager;
use crate::models::task::TaskId;

const WATCH_REFRESH: Duration = Duration::from_millis(500);

const HELP: &str = "\
Commands:
  upload <path>   submit a PDF or image for processing
  cancel <id>     cancel a pending or processing task
  status <id>     show one task
  list            show every task
  watch <id>      follow a task until it finishes
  help            show this message
  exit            quit";

pub fn run_cli(manager: TaskManager, max_upload_bytes: u64) -> Result<()> {
    println!("Upload tracker started. Enter a command, 'help' or 'exit' to quit.");
    let mut history: Vec<String> = Vec::new();

    loop {
        let Some(input) = read_line(&history)? else {
            break;
        };
        if !input.trim().is_empty() {
            history.push(input.clone());
        }

        let mut args = input.split_whitespace();
        match args.next() {
            Some("upload") => {
                let path = args.collect::<Vec<_>>().join(" ");
                if path.is_empty() {
                    println!("File path must be specified.");
                    continue;
                }
                match validate_file(Path::new(&path), max_upload_bytes)
                    .and_then(|filename| manager.create_task(filename))
                {
                    Ok(id) => {
                        println!("Created task with ID: {}", id);
                        println!("Use `status {}` to check the status", id);
                    }
                    Err(e) => println!("{}", e),
                }
            }
            Some("cancel") => {
                let Some(id) = task_id_arg(args.next()) else {
                    continue;
                };
                match manager.cancel_task(&id) {
                    Ok(true) => println!("Task {} cancelled", id),
                    Ok(false) => println!("Task {} is not running", id),
                    Err(e) => println!("{}", e),
                }
            }
            Some("status") => {
                let Some(id) = task_id_arg(args.next()) else {
                    continue;
                };
                match manager.get_task(&id) {
                    Some(task) => println!("{}", render_task(&task)),
                    None => println!("Task {} not found", id),
                }
            }
            Some("list") => {
                for line in render_task_list(&manager.get_all_tasks()) {
                    println!("{}", line);
                }
            }
            Some("watch") => {
                let Some(id) = task_id_arg(args.next()) else {
                    continue;
                };
                watch(&manager, &id);
            }
            Some("help") => println!("{}", HELP),
            Some("exit") => {
                println!("Exiting the program...");
                break;
            }
            Some(cmd) => println!("Unknown command: {}. Please try again.", cmd),
            None => continue,
        }
    }

    manager.shutdown();
    Ok(())
}

fn task_id_arg(arg: Option<&str>) -> Option<TaskId> {
    match arg {
        Some(id) => Some(TaskId::from(id)),
        None => {
            println!("Task ID must be specified.");
            None
        }
    }
}

fn watch(manager: &TaskManager, id: &TaskId) {
    println!("Watching task {}.", id);
    let mut last = None;
    loop {
        let Some(task) = manager.get_task(id) else {
            println!("Task {} not found", id);
            return;
        };
        let line = render_task(&task);
        if last.as_ref() != Some(&line) {
            println!("{}", line);
            last = Some(line);
        }
        if task.status.is_terminal() {
            return;
        }
        thread::sleep(WATCH_REFRESH);
    }
}

/// Reads one line in raw mode with Up/Down history. Returns `None` on Ctrl-C
/// or Ctrl-D.
fn read_line(history: &[String]) -> Result<Option<String>> {
    print!("\r>>> ");
    io::stdout().flush()?;

    terminal::enable_raw_mode()?;
    let result = read_keys(history);
    terminal::disable_raw_mode()?;
    println!();
    result
}

fn read_keys(history: &[String]) -> Result<Option<String>> {
    let mut input = String::new();
    let mut history_index = history.len();

    loop {
        let Event::Key(key_event) = event::read()? else {
            continue;
        };
        if key_event.kind != KeyEventKind::Press {
            continue;
        }
        let ctrl = key_event.modifiers.contains(KeyModifiers::CONTROL);

        match key_event.code {
            KeyCode::Enter => return Ok(Some(input)),
            KeyCode::Char('c') | KeyCode::Char('d') if ctrl => return Ok(None),
            KeyCode::Up => {
                if history_index > 0 {
                    history_index -= 1;
                    input = history[history_index].clone();
                    redraw(&input)?;
                }
            }
            KeyCode::Down => {
                if history_index < history.len() {
                    history_index += 1;
                }
                input = history.get(history_index).cloned().unwrap_or_default();
                redraw(&input)?;
            }
            KeyCode::Char(c) => {
                input.push(c);
                print!("{}", c);
                io::stdout().flush()?;
            }
            KeyCode::Backspace => {
                input.pop();
                redraw(&input)?;
            }
            _ => {}
        }
    }
}

fn redraw(input: &str) -> Result<()> {
    execute!(
        io::stdout(),
        cursor::MoveToColumn(0),
        terminal::Clear(terminal::ClearType::CurrentLine)
    )?;
    print!(">>> {}", input);
    io::stdout().flush()?;
    Ok(())
}
