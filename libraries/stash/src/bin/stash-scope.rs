use std::path::PathBuf;

use stash::KeyValueStore as _;
use stash::storage::FileStorage;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() != 2 && args.len() != 3 {
        eprintln!("Usage: {} <storage-dir> [key]", args[0]);
        eprintln!("\nExample: {} ./.logbook gym_session_draft", args[0]);
        std::process::exit(1);
    }

    let dir = PathBuf::from(&args[1]);

    if !dir.is_dir() {
        eprintln!("Error: '{}' is not a directory", dir.display());
        std::process::exit(1);
    }

    let store = match FileStorage::open(&dir) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error opening storage '{}': {e}", dir.display());
            std::process::exit(1);
        }
    };

    if let Some(key) = args.get(2) {
        show_key(&store, key);
    } else {
        list_keys(&store);
    }
}

fn list_keys(store: &FileStorage) {
    println!("StashScope - Local Storage Analyzer");
    println!("===================================");
    println!("Directory: {}", store.root().display());
    println!();

    let keys = match store.keys() {
        Ok(keys) => keys,
        Err(e) => {
            eprintln!("Error listing keys: {e}");
            std::process::exit(1);
        }
    };

    if keys.is_empty() {
        println!("  No keys found");
        return;
    }

    let mut malformed = 0;
    for key in &keys {
        match store.get(key) {
            Ok(Some(value)) => {
                let parses = serde_json::from_str::<serde_json::Value>(&value).is_ok();
                if !parses {
                    malformed += 1;
                }
                println!(
                    "  {key}: {} bytes{}",
                    value.len(),
                    if parses { "" } else { " (MALFORMED JSON)" }
                );
            }
            Ok(None) => println!("  {key}: vanished while listing"),
            Err(e) => println!("  {key}: unreadable ({e})"),
        }
    }

    println!();
    println!("Summary:");
    println!("--------");
    println!("  Total keys: {}", keys.len());
    if malformed == 0 {
        println!("  All values are valid JSON");
    } else {
        println!("  {malformed} value(s) are not valid JSON and will be ignored on load");
    }
}

fn show_key(store: &FileStorage, key: &str) {
    match store.get(key) {
        Ok(Some(value)) => match serde_json::from_str::<serde_json::Value>(&value) {
            Ok(json) => match serde_json::to_string_pretty(&json) {
                Ok(pretty) => println!("{pretty}"),
                Err(_) => println!("{value}"),
            },
            Err(e) => {
                println!("{value}");
                eprintln!("\nWarning: value is not valid JSON ({e})");
            }
        },
        Ok(None) => {
            eprintln!("Key '{key}' not found");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error reading '{key}': {e}");
            std::process::exit(1);
        }
    }
}
