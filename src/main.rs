use std::process;

use pipesh::{cli, logging, Flow, Shell, ShellConfig};

fn main() {
    match run_main() {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("pipesh: {err:?}");
            process::exit(1);
        }
    }
}

fn run_main() -> anyhow::Result<i32> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;

    let mut config = ShellConfig::from_env();
    if args.no_color {
        config.color = false;
    }
    if !config.color {
        colored::control::set_override(false);
    }

    let mut shell = Shell::new(config);

    if let Some(line) = args.command {
        return Ok(match shell.run_line(&line) {
            Flow::Exit => 0,
            Flow::Continue => shell.session().last_status,
        });
    }

    Ok(shell.run()?)
}
