use std::fs::File;
use std::io::{self, BufReader, IsTerminal};

use anyhow::{Context, Result};
use log::debug;
use pn_engine::config::PnConfig;
use pn_engine::options::Options;
use pn_engine::shell::Shell;

fn main() -> Result<()> {
    if std::env::var("PN_LOG").is_ok() {
        let e = env_logger::Env::new()
            .filter("PN_LOG")
            .write_style("PN_LOG_STYLE");
        env_logger::init_from_env(e);
    }

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let options = Options::parse_from_args(&args)?;
    debug!("PN options: {:?}", options);

    let mut config = PnConfig::load_from_file(&options.config)?;
    options.apply(&mut config);
    debug!("PN config: {:?}", config);

    let mut shell = Shell::new(config);
    let stdout = io::stdout();
    match &options.script {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open script: {:?}", path))?;
            shell.run(BufReader::new(file), stdout.lock(), false)?;
        }
        None => {
            let stdin = io::stdin();
            let interactive = stdin.is_terminal();
            shell.run(stdin.lock(), stdout.lock(), interactive)?;
        }
    }
    shell.finish()
}
