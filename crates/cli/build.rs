use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("unpage")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Unpage Contributors")
        .about("Load every page of a paginated article into one document")
        .arg(clap::arg!(<URL> "URL of any page of the article"))
        .arg(clap::arg!(--page <FILE> "Saved copy of the live page, or '-' for stdin").value_name("FILE"))
        .arg(
            clap::arg!(-o --output <FILE> "Output file (default: stdout)")
                .value_name("FILE")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(-f --format <FORMAT> "Output format (html, article, json)")
                .value_name("FORMAT")
                .default_value("html")
                .value_parser(["html", "article", "json"]),
        )
        .arg(clap::arg!(--max_pages <NUM> "Give up after this many pages").default_value("50"))
        .arg(clap::arg!(--timeout <SECS> "HTTP timeout in seconds").default_value("30"))
        .arg(clap::arg!(--session_timeout <SECS> "Limit for the whole session in seconds").default_value("300"))
        .arg(clap::arg!(--user_agent <UA> "Custom User-Agent for HTTP requests").value_name("UA"))
        .arg(
            clap::arg!(--config_dir <DIR> "Custom site descriptor directory")
                .value_name("DIR")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(-v --verbose "Enable debug logging"));

    for shell in [
        clap_complete::Shell::Bash,
        clap_complete::Shell::Zsh,
        clap_complete::Shell::Fish,
        clap_complete::Shell::PowerShell,
    ] {
        clap_complete::generate_to(shell, &mut cmd, "unpage", &completions_dir).unwrap();
    }

    println!(
        "cargo:warning=Shell completions generated in: {}",
        completions_dir.display()
    );
}
