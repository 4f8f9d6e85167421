// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::rt::System;
use actix_web::{App, HttpServer, middleware::Logger};
use log::info;
use std::path::PathBuf;

use usertags::app_state::AppState;
use usertags::bootstrap::{self, BootstrapResult};
use usertags::config::ValidatedConfig;
use usertags::iam::UserServices;
use usertags::iam::middleware::JwtAuthMiddlewareFactory;
use usertags::runtime_paths::RuntimePaths;
use usertags::util;

const HELP_TEXT: &str = "\
usage: usertags [-C <root>] [command]

commands:
  serve            bootstrap the runtime root and start the HTTP server (default)
  token <email>    print a session token for an existing user
  help             show this message

options:
  -C <root>        runtime directory holding config.yaml, users.yaml and state/ (default .)
";

#[derive(Debug)]
enum RunMode {
    Serve,
    Token(String),
    Help,
}

#[derive(Debug)]
struct ParsedArgs {
    runtime_root: PathBuf,
    mode: RunMode,
}

fn main() {
    let exit_code = run();
    std::process::exit(exit_code);
}

fn run() -> i32 {
    let parsed_args = match parse_args() {
        Ok(args) => args,
        Err(error) => {
            eprintln!("❌ Invalid command line arguments: {}", error);
            eprintln!("❌ Run `usertags help` for usage.");
            return 1;
        }
    };

    if matches!(parsed_args.mode, RunMode::Help) {
        print!("{}", HELP_TEXT);
        return 0;
    }

    let bootstrap = match bootstrap::bootstrap_runtime(&parsed_args.runtime_root) {
        Ok(result) => result,
        Err(error) => {
            eprintln!("❌ Bootstrap error: {}", error);
            eprintln!("❌ Application cannot start with invalid configuration.");
            return 1;
        }
    };

    match parsed_args.mode {
        RunMode::Token(email) => print_token(&bootstrap, &email),
        _ => match System::new().block_on(run_server(bootstrap)) {
            Ok(()) => 0,
            Err(error) => {
                eprintln!("❌ Server failed to start: {}", error);
                1
            }
        },
    }
}

fn print_token(bootstrap: &BootstrapResult, email: &str) -> i32 {
    let user_services = match UserServices::new(
        &bootstrap.validated_config,
        bootstrap.runtime_paths.users_file.clone(),
    ) {
        Ok(services) => services,
        Err(error) => {
            eprintln!("❌ Failed to load users: {}", error);
            return 1;
        }
    };

    let Some(user) = user_services.get_user_by_email(email) else {
        eprintln!("❌ No user with email {}", email);
        return 1;
    };

    match user_services.jwt_service().create_token(&user) {
        Ok(token) => {
            println!("{}", token);
            0
        }
        Err(error) => {
            eprintln!("❌ Failed to create token: {}", error);
            1
        }
    }
}

async fn run_server(bootstrap: BootstrapResult) -> std::io::Result<()> {
    let validated_config = bootstrap.validated_config;
    let runtime_paths = bootstrap.runtime_paths;

    util::init_logger(validated_config.log_level(), util::default_level_rules()).map_err(
        |error| {
            eprintln!("❌ Failed to initialize logger: {}", error);
            std::io::Error::other(error.to_string())
        },
    )?;

    log_startup_info(&validated_config, &runtime_paths);

    let workers = validated_config.server.workers;
    let host = validated_config.server.host.clone();
    let port = validated_config.server.port;

    let app_state = match AppState::new(validated_config, runtime_paths) {
        Ok(state) => state,
        Err(error) => {
            eprintln!("❌ {}", error);
            eprintln!("❌ Application cannot start without its stores.");
            return Err(std::io::Error::other(error.to_string()));
        }
    };
    info!("✅ User and tag stores initialized");

    HttpServer::new(move || {
        let app_state = app_state.clone();
        App::new()
            .wrap(JwtAuthMiddlewareFactory)
            .wrap(Logger::default())
            .configure(|cfg| app_state.configure(cfg))
    })
    .workers(workers)
    .bind((host.as_str(), port))?
    .run()
    .await
}

fn log_startup_info(config: &ValidatedConfig, runtime_paths: &RuntimePaths) {
    info!("Starting usertags {}", env!("CARGO_PKG_VERSION"));
    info!("Runtime root: {}", runtime_paths.root.display());
    info!("User tags file: {}", runtime_paths.user_tags_file.display());
    info!("Workers: {}", config.server.workers);
    info!(
        "Listening on http://{}:{} (admin at {})",
        config.server.host, config.server.port, config.admin.path
    );
    if !config.is_localhost_only() {
        info!("Session cookies are marked Secure; serve behind HTTPS");
    }
}

fn parse_args() -> Result<ParsedArgs, String> {
    parse_args_from(std::env::args().skip(1))
}

fn parse_args_from<I>(args: I) -> Result<ParsedArgs, String>
where
    I: IntoIterator<Item = String>,
{
    let args: Vec<String> = args.into_iter().collect();
    if args.iter().any(|arg| is_help_flag(arg)) {
        return Ok(ParsedArgs {
            runtime_root: PathBuf::from("."),
            mode: RunMode::Help,
        });
    }

    let mut args = args.into_iter();
    let mut runtime_root = PathBuf::from(".");
    let mut tokens = Vec::new();

    while let Some(arg) = args.next() {
        if arg == "--" {
            continue;
        } else if arg == "-C" {
            let value = args
                .next()
                .ok_or_else(|| "Missing value for -C".to_string())?;
            runtime_root = PathBuf::from(value);
        } else {
            tokens.push(arg);
        }
    }

    let mode = match tokens.as_slice() {
        [] => RunMode::Serve,
        [command] if command.eq_ignore_ascii_case("serve") => RunMode::Serve,
        [command] if command.eq_ignore_ascii_case("help") => RunMode::Help,
        [command, email] if command.eq_ignore_ascii_case("token") => {
            RunMode::Token(email.clone())
        }
        [command] if command.eq_ignore_ascii_case("token") => {
            return Err("token requires an email address".to_string());
        }
        other => return Err(format!("Unknown command: {}", other.join(" "))),
    };

    let runtime_root = make_runtime_root_absolute(runtime_root)?;
    Ok(ParsedArgs { runtime_root, mode })
}

fn is_help_flag(arg: &str) -> bool {
    arg == "-h" || arg == "--help"
}

fn make_runtime_root_absolute(runtime_root: PathBuf) -> Result<PathBuf, String> {
    if runtime_root.is_absolute() {
        return Ok(runtime_root);
    }

    let current_dir = std::env::current_dir()
        .map_err(|error| format!("Failed to resolve current directory: {}", error))?;
    Ok(current_dir.join(runtime_root))
}
