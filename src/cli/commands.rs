use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use clap::CommandFactory;
use clap_complete::generate;
use kurbo::{Point, Vec2};
use tracing::{debug, instrument};

use crate::application::services::BoardService;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::CliResult;
use crate::cli::output;
use crate::config::{global_config_path, Settings};
use crate::domain::{NodeId, TreeDisplay};
use crate::infrastructure::traits::{ManualClock, MemoryStore};
use crate::infrastructure::{InfraError, ServiceContainer};

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Demo {
            collapse,
            detach,
            reparent,
        }) => _demo(cli.config.as_deref(), *collapse, *detach, *reparent),
        Some(Commands::Config { command }) => _config(cli.config.as_deref(), command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            generate(*shell, &mut cmd, "mindboard", &mut io::stdout());
            Ok(())
        }
        None => {
            let mut cmd = Cli::command();
            cmd.print_help()
                .map_err(|e| InfraError::io("print help", e))?;
            Ok(())
        }
    }
}

#[instrument]
fn _config(explicit: Option<&Path>, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load(explicit)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::action("global", &path.display()),
                None => output::action("global", &"<no home directory>"),
            }
            if let Some(path) = explicit {
                output::action("file", &path.display());
            }
            let settings = Settings::load(explicit)?;
            output::action("data", &settings.storage.data_dir.display());
        }
        ConfigCommands::Template => output::info(&Settings::template()),
    }
    Ok(())
}

/// Titles of the sample board: root, then each branch with its leaves.
const DEMO_BRANCHES: [(&str, &[&str]); 3] = [
    ("layout", &["stacking", "summaries"]),
    ("drag", &["reorder", "detach", "reparent"]),
    ("visibility", &[]),
];

#[instrument]
fn _demo(explicit: Option<&Path>, collapse: bool, detach: bool, reparent: bool) -> CliResult<()> {
    let settings = Settings::load(explicit)?;
    let clock = Arc::new(ManualClock::new());
    let container =
        ServiceContainer::with_deps(settings, Arc::new(MemoryStore::new()), clock.clone());
    let mut service = container.board_service("demo");

    let center = container.settings.layout.canvas_center();
    let root = service.create_with_title("mindboard", None, center)?;
    let mut branches = Vec::new();
    for (title, leaves) in DEMO_BRANCHES {
        let branch = service.create_with_title(title, Some(root), Point::ZERO)?;
        for leaf in leaves {
            service.create_with_title(leaf, Some(branch), Point::ZERO)?;
        }
        branches.push(branch);
    }
    debug!("demo: built {} nodes", service.board().len());

    if collapse {
        service.toggle_expand(branches[1])?;
        output::success(&format!("collapsed '{}'", DEMO_BRANCHES[1].0));
    }
    if detach {
        demo_detach(&mut service, branches[0])?;
    }
    if reparent {
        demo_reparent(&mut service, &clock, branches[0], branches[2])?;
    }

    output::header(&format!("board '{}'", service.title()));
    let tree = service.board().to_tree();
    writeln!(io::stdout(), "{tree}").map_err(|e| InfraError::io("write board", e))?;
    Ok(())
}

fn demo_detach(service: &mut BoardService, node: NodeId) -> CliResult<()> {
    let pull = service.proximity().tuning().detach_threshold + 1.0;
    service.drag_start(node)?;
    let feedback = service.drag_update(Vec2::new(pull, 0.0))?;
    if let Some(parent) = feedback.detached_from {
        output::success(&format!("detached {node} from {parent}"));
    }
    if let Some(end) = service.drag_end()? {
        output::detail(&format!(
            "came to rest at ({:.1}, {:.1})",
            end.local_position.x, end.local_position.y
        ));
    }
    Ok(())
}

fn demo_reparent(
    service: &mut BoardService,
    clock: &ManualClock,
    node: NodeId,
    target: NodeId,
) -> CliResult<()> {
    let board = service.board();
    let (Some(from), Some(to)) = (board.global_position(node), board.global_position(target))
    else {
        return Ok(());
    };
    service.drag_start(node)?;
    let feedback = service.drag_update(to - from)?;
    if feedback.reordered {
        output::detail(&"swapped sibling order while dragging");
    }

    clock.advance(service.proximity().tuning().proximity_delay());
    match service.poll()? {
        Some(event) => output::success(&format!(
            "re-parented {} under {}",
            event.node, event.new_parent
        )),
        None => output::detail(&"no node in reach"),
    }
    service.drag_end()?;
    Ok(())
}
