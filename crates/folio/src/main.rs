use anyhow::Result;
use log::LevelFilter;
use std::cell::Cell;
use std::env;
use std::io::Write;
use std::rc::Rc;
use tokio::io::{AsyncBufReadExt, BufReader};

use folio::command_processor::{page_status, HELP};
use folio::{Autosave, CommandProcessor, Config, Document, DocumentEvent, SnapshotManager};

#[tokio::main]
async fn main() -> Result<()> {
    let mut logger = env_logger::Builder::from_default_env();
    if env::var_os("RUST_LOG").is_none() {
        logger.filter_level(LevelFilter::Info);
        logger.filter_module("folio", LevelFilter::Debug);
    }
    logger.init();

    let config = Config::load().await?;
    let snapshots = SnapshotManager::new()?;
    let mut document = Document::from_config(&config);

    // folio [NAME] opens a saved document
    if let Some(name) = env::args().nth(1) {
        match snapshots.load(&name).await {
            Ok(snapshot) => {
                document.load_state(snapshot.state)?;
                log::info!("Opened '{}'", name);
            }
            Err(e) => {
                eprintln!("Failed to open '{}': {:#}", name, e);
                return Err(e);
            }
        }
    }

    let dirty = Rc::new(Cell::new(false));
    let flag = dirty.clone();
    document.subscribe(move |_: &DocumentEvent| flag.set(true));

    let autosave = config
        .autosave
        .enabled
        .then(|| Autosave::spawn(snapshots.clone(), config.autosave.name.clone()));

    let processor = CommandProcessor::new(snapshots);
    let mut should_quit = false;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{}", HELP);
    while !should_quit {
        print!("[{}] > ", page_status(&document));
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match processor
            .execute_command(&line, &mut document, &mut should_quit)
            .await
        {
            Ok(output) if output.is_empty() => {}
            Ok(output) => println!("{}", output),
            Err(e) => eprintln!("Error: {:#}", e),
        }

        if dirty.replace(false) {
            if let Some(autosave) = &autosave {
                autosave.enqueue(document.state());
            }
        }
    }

    if let Some(autosave) = autosave {
        let writes = autosave.shutdown().await?;
        log::info!("Autosave finished after {} writes", writes);
    }

    Ok(())
}
