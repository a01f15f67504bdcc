use std::str::FromStr;

use clap::error::ErrorKind;
use clap::CommandFactory;
use target_lexicon::{Architecture, Triple};

use crate::args::{Arguments, Options};

/// The triple to lower for. Only x86-64 triples are supported, and an unknown x86-64 system is
/// the default.
pub fn get_target(opts: &Options) -> Triple {
    let target = match opts.target {
        Some(ref target) => Triple::from_str(target).map_err(|error| error.to_string()),
        None => Ok(Triple {
            architecture: Architecture::X86_64,
            ..Triple::unknown()
        }),
    };

    let error = match target {
        Ok(target) if target.architecture == Architecture::X86_64 => return target,
        Ok(target) => format!("unsupported architecture `{}`", target.architecture),
        Err(error) => error,
    };

    let mut cmd = Arguments::command();
    cmd.error(ErrorKind::InvalidValue, error).exit()
}
