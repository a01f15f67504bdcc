use anyhow::{anyhow, bail, Context};
use console::style;
use log::debug;
use sprig_backend::linearize::linearize;
use sprig_backend::select::{DynamicCovering, X86_64};
use sprig_backend::target::Target;
use sprig_common::pretty::Prettier;

use crate::args::{Options, Stage};
use crate::samples::{self, SAMPLES};
use crate::target::get_target;

/// Lower a sample and print the requested stage.
pub fn lower(opts: Options) -> anyhow::Result<()> {
    let sample = samples::find(&opts.sample).ok_or_else(|| {
        anyhow!(
            "no sample named `{}`, see `sprigc list` for the available ones",
            opts.sample
        )
    })?;

    let triple = get_target(&opts);
    debug!("lowering `{}` for {triple}", sample.name);

    let mut program = sample
        .build()
        .with_context(|| format!("could not build sample `{}`", sample.name))?;

    let mut target = Target::x86_64();
    if let Some(area) = program.spill_area.take() {
        target = target.with_spill_area(area);
    }

    if let Some(count) = opts.registers {
        if count == 0 || count > target.palette.len() {
            bail!(
                "cannot allocate from {count} registers, pick between 1 and {}",
                target.palette.len()
            );
        }

        target.palette.truncate(count);
    }

    println!("{} {}", style(sample.name).bold(), style(triple).dim());

    match opts.stage {
        Stage::Tree => {
            let prettier = Prettier::new(&program.nodes);
            print!("{}", prettier.pretty_cfg(&program.cfg));
        }

        Stage::Linear => {
            let covering = DynamicCovering::new(X86_64.as_slice());
            let linear = linearize(
                &program.cfg,
                &program.nodes,
                &covering,
                &mut program.registers,
            );

            let prettier = Prettier::new(&program.nodes);
            print!("{}", prettier.pretty_program(&linear));
        }

        Stage::Allocated => {
            let lowered = sprig_backend::lower(
                &program.cfg,
                &program.nodes,
                &mut program.registers,
                &target,
            );

            let prettier = Prettier::new(&program.nodes);
            print!("{}", prettier.pretty_program(&lowered.program));

            let mut allocation: Vec<_> = lowered.allocation.iter().collect();
            allocation.sort();

            println!();
            for (virtual_register, color) in allocation {
                println!("{virtual_register} -> {color}");
            }

            println!(
                "{}",
                style(format!("{} bytes spilled", lowered.spilled_offset)).dim()
            );
        }

        Stage::Asm => {
            let lowered = sprig_backend::lower(
                &program.cfg,
                &program.nodes,
                &mut program.registers,
                &target,
            );

            let asm = lowered
                .asm()
                .with_context(|| format!("could not emit `{}`", sample.name))?;
            print!("{asm}");
        }
    }

    Ok(())
}

/// Print the built-in samples.
pub fn list() -> anyhow::Result<()> {
    for sample in SAMPLES {
        println!("{:<10} {}", style(sample.name).bold(), style(sample.description).dim());
    }

    Ok(())
}
