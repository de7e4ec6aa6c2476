use std::{env, env::VarError};

/// There's no real CLI for the server. Any argument at all prints the help.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
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
    // Secrets are deliberately absent from this list
    const DISPLAY_ENVS: [&str; 11] = [
        "RUST_LOG",
        "VAULT_HOST",
        "VAULT_PORT",
        "VAULT_DATABASE_URL",
        "VAULT_PAYSTACK_PUBLIC_KEY",
        "VAULT_PAYSTACK_IP_WHITELIST",
        "VAULT_USE_X_FORWARDED_FOR",
        "VAULT_USE_FORWARDED",
        "VAULT_SESSION_LIFETIME_MINS",
        "VAULT_SESSION_REFRESH_MINS",
        "VAULT_SECURE_COOKIES",
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
