// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// One command is supported:
//   `refine` — runs the full iterative refinement loop
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

// Declare the commands submodule
pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, RefineArgs};

/// The main CLI struct — clap reads the fields and generates
/// argument parsing code automatically via the Parser derive macro.
#[derive(Parser, Debug)]
#[command(
    name = "cdr-refine",
    version = "0.1.0",
    about = "Iteratively refine an antibody CDR generator on its own best redesigns."
)]
pub struct Cli {
    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    /// This keeps the CLI layer thin — it only routes, never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Refine(args) => Self::run_refine(args),
        }
    }

    /// Handles the `refine` subcommand.
    /// Wires up the production collaborators, converts CLI args
    /// into a RefineConfig, and hands off to Layer 2.
    fn run_refine(args: RefineArgs) -> Result<()> {
        use crate::application::refine_use_case::{RefineConfig, RefineUseCase};
        use crate::infra::oracle::DdgCommandOracle;
        use crate::infra::structure_store::JsonStructureStore;
        use crate::ml::model::{ModelLaunch, ProcessModel};

        let mut model = ProcessModel::launch(ModelLaunch {
            command:           &args.model_cmd,
            pretrained_ckpt:   &args.pretrained_ckpt,
            embedding_ckpt:    &args.embedding_ckpt,
            embedding_variant: &args.embedding_variant,
            device:            &args.device,
        })?;
        let oracle = DdgCommandOracle::new(args.ddg_cmd.clone());
        let store = JsonStructureStore::new();

        let config: RefineConfig = args.into();
        let save_dir = config.save_dir.clone();
        let use_case = RefineUseCase::new(config);
        use_case.execute(&mut model, &oracle, &store)?;

        println!("Refinement complete. Results saved under '{save_dir}'.");
        Ok(())
    }
}
