//! oh_cards — interactive entry point.

use oh_cards::app::{run, AppConfig};

fn main() {
    env_logger::init();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║         OH Cards — Soul Color Divination Table               ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let mut cfg = AppConfig::default();
    cfg.api_key = std::env::var("GEMINI_API_KEY").ok();
    if cfg.api_key.is_none() {
        println!("  GEMINI_API_KEY not set — readings use the offline oracle.");
    }

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--hand" => cfg.start_in_hand_mode = true,
            "--tracker" => {
                // Everything after --tracker is the detector argv.
                cfg.tracker_command = args.by_ref().collect();
                cfg.start_in_hand_mode = true;
            }
            "--cards" => {
                if let Some(n) = args.next().and_then(|v| v.parse().ok()) {
                    cfg.deck_size = n;
                }
            }
            "--seed" => {
                cfg.seed = args.next().and_then(|v| v.parse().ok());
            }
            "--help" | "-h" => {
                print_usage();
                return;
            }
            other => {
                eprintln!("unknown argument: {}", other);
                print_usage();
                std::process::exit(2);
            }
        }
    }

    println!("  Controls:");
    println!("    mouse move / hand  — cursor");
    println!("    click / Enter      — advance, select, restart");
    println!("    Tab                — toggle hand/mouse mode");
    println!("    R                  — restart session");
    println!("    Q                  — quit");
    println!();
    println!("  Opening table window…");
    println!();

    if let Err(e) = run(cfg) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_usage() {
    println!("usage: oh_cards [--hand] [--cards N] [--seed N] [--tracker CMD ARGS...]");
    println!();
    println!("  --hand           start in hand-tracking mode");
    println!("  --cards N        deck size (default 88)");
    println!("  --seed N         fixed deck RNG seed");
    println!("  --tracker ...    hand detector command (implies --hand, consumes");
    println!("                   the rest of the argument list)");
}
