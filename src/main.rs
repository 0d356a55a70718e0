//! Screener entrypoint: scores every session JSON under the inbox (or the path
//! given as first argument). Runs one pass, or a daemon loop when a poll
//! interval is configured; results go to stdout as JSON lines and to the
//! encrypted store / uplink in the background.

use dyslexia_screen::{
    config::ScreenerConfig,
    logging::{ScreeningLine, StructuredLogger},
    model::SharedModel,
    screener::Screener,
    session::ScreeningSession,
    storage::{ResultWriter, SecureStore},
    uplink::UplinkClient,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use walkdir::WalkDir;

fn session_files(root: &Path) -> Vec<PathBuf> {
    if root.is_file() {
        return vec![root.to_path_buf()];
    }
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    files
}

fn score_file(screener: &Screener, path: &Path) {
    let source = path.display().to_string();
    let session = std::fs::read_to_string(path)
        .map_err(dyslexia_screen::ScreeningError::from)
        .and_then(|data| ScreeningSession::from_json(&data));
    let mut stdout = std::io::stdout().lock();
    match session {
        Ok(session) => {
            let result = screener.assess(&session);
            let mut line = ScreeningLine::new(session.label(), Some(source.as_str()));
            match &result {
                Ok(assessment) => line.assessment = Some(assessment),
                Err(e) => {
                    warn!(source = %source, error = %e, "session not scored");
                    line.error = Some(e.to_string());
                }
            }
            StructuredLogger::emit_json(&line, &mut stdout);
        }
        Err(e) => {
            warn!(source = %source, error = %e, "session rejected");
            let mut line = ScreeningLine::new("unknown", Some(source.as_str()));
            line.error = Some(e.to_string());
            StructuredLogger::emit_json(&line, &mut stdout);
        }
    }
}

fn run_one_pass(screener: &Screener, root: &Path, seen: &mut HashSet<PathBuf>) -> usize {
    let mut scored = 0;
    for path in session_files(root) {
        if !seen.insert(path.clone()) {
            continue;
        }
        score_file(screener, &path);
        scored += 1;
    }
    scored
}

fn open_store(config: &ScreenerConfig) -> Option<Arc<SecureStore>> {
    if !config.storage.enabled {
        return None;
    }
    if let Err(e) = std::fs::create_dir_all(&config.data_dir) {
        warn!(data_dir = ?config.data_dir, error = %e, "data dir unavailable; results not stored");
        return None;
    }
    let secret = std::env::var("SCREEN_STORE_SECRET").unwrap_or_else(|_| {
        warn!("SCREEN_STORE_SECRET not set; using development secret");
        "dev-secret-change-in-production".to_string()
    });
    match SecureStore::open(&config.data_dir.join("results.db"), secret.as_bytes()) {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            warn!(error = %e, "result store unavailable; results not stored");
            None
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = std::env::var("SCREEN_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.json"));
    let config = ScreenerConfig::load(&config_path);

    StructuredLogger::init(config.log.json, &config.log.level);

    let root = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| config.inbox.dir.clone());
    info!(inbox = %root.display(), data_dir = ?config.data_dir, "screener starting");

    let store = open_store(&config);
    let uplink = UplinkClient::new(&config.uplink);
    let model = Arc::new(SharedModel::lazy(config.model.clone()));
    let mut screener = Screener::from_config(&config, model);
    if store.is_some() || uplink.is_some() {
        screener = screener.with_writer(ResultWriter::spawn(store, uplink));
    }

    let interval_secs = config.inbox.poll_interval_secs;
    let mut seen = HashSet::new();

    if interval_secs > 0 {
        info!(interval_secs, "daemon mode (Ctrl+C to stop)");
        static STOP: AtomicBool = AtomicBool::new(false);
        let _ = ctrlc::set_handler(|| {
            STOP.store(true, Ordering::Relaxed);
        });
        let mut cycle: u64 = 0;
        while !STOP.load(Ordering::Relaxed) {
            cycle += 1;
            let scored = run_one_pass(&screener, &root, &mut seen);
            if scored > 0 {
                info!(cycle, scored, "inbox pass complete");
            }
            for _ in 0..interval_secs {
                if STOP.load(Ordering::Relaxed) {
                    break;
                }
                std::thread::sleep(Duration::from_secs(1));
            }
        }
        info!("screener stopping");
    } else {
        let scored = run_one_pass(&screener, &root, &mut seen);
        info!(scored, model = ?screener.model_info(), "screening pass complete");
    }

    screener.shutdown();
    Ok(())
}
