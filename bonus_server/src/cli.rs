use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // BONUS_DATABASE_URL usually carries a password, so it is left out
    const DISPLAY_ENVS: [&str; 14] = [
        "RUST_LOG",
        "BONUS_HOST",
        "BONUS_PORT",
        "BONUS_DB_MAX_CONNECTIONS",
        "BONUS_DB_RETRY_DELAYS",
        "BONUS_RUN_MIGRATIONS",
        "BONUS_ACCRUAL_URL",
        "BONUS_ACCRUAL_TIMEOUT",
        "BONUS_ACCRUAL_MAX_RETRIES",
        "BONUS_ACCRUAL_BACKOFF_MS",
        "BONUS_RECONCILE_INTERVAL",
        "BONUS_RECONCILE_BATCH_SIZE",
        "BONUS_RECONCILE_CONCURRENCY",
        "BONUS_RECONCILE_TIMEOUT",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
