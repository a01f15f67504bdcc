use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

/// a compiler backend lowering intermediate form trees to x86-64 assembly.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
#[command(propagate_version = true)]
pub struct Arguments {
    #[command(subcommand)]
    pub command: Command,
}

impl Arguments {
    pub fn verbosity(&self) -> u8 {
        match &self.command {
            Command::Lower(opts) => opts.verbose,
            Command::List => 0,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Lower one of the built-in sample programs.
    #[command(visible_alias = "l")]
    Lower(Options),
    /// List the built-in sample programs.
    #[command(visible_alias = "ls")]
    List,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum Stage {
    /// The trees and edges of the control flow graph.
    Tree,
    /// The linearized program, before register allocation.
    Linear,
    /// The program after register allocation, along with the allocation.
    Allocated,
    /// NASM assembly.
    #[default]
    Asm,
}

#[derive(Debug, Args)]
pub struct Options {
    /// The stage to print.
    #[arg(short, long, value_enum, default_value_t)]
    pub stage: Stage,

    /// Only allocate from the first N registers of the palette.
    #[arg(short, long)]
    pub registers: Option<usize>,

    /// The target to compile the code for.
    #[arg(short, long)]
    pub target: Option<String>,

    /// Log more, repeat for even more.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(required = true)]
    pub sample: String,
}
