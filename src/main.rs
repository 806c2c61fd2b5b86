use std::io::{BufRead, Write};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ragbert::{
    Assistant, Config,
    cli::{Cli, Command},
    error::Result,
};

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("RAGBERT_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Command::Completions(args) = &cli.command {
        args.generate();
        return Ok(());
    }

    let config =
        Config::from_env(cli.index_dir.as_deref(), cli.docs_dir.as_deref())?;
    let assistant = Assistant::new(config)?;

    match cli.command {
        Command::Ask(args) => {
            println!("{}", assistant.answer(&args.question));
        }
        Command::Chat => {
            run_chat(&assistant)?;
        }
        Command::Reindex => {
            println!("{}", assistant.reindex());
        }
        Command::Status(args) => {
            cmd_status(&assistant, args.json)?;
        }
        Command::Completions(_) => unreachable!("handled above"),
    }

    Ok(())
}

fn run_chat(assistant: &Assistant) -> Result<()> {
    println!(
        "ragbert chat ({} chunks indexed). Type a question, `:reindex`, \
         `:count`, or `exit`.",
        assistant.chunk_count()?
    );

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut line = String::new();

    loop {
        print!("> ");
        stdout.flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let input = line.trim();
        match input {
            "" => continue,
            "exit" | "quit" => break,
            ":reindex" => println!("{}", assistant.reindex()),
            ":count" => {
                println!("{} chunks indexed", assistant.chunk_count()?);
            }
            question => println!("{}\n", assistant.answer(question)),
        }
    }

    Ok(())
}

fn cmd_status(assistant: &Assistant, json: bool) -> Result<()> {
    let config = assistant.config();
    let chunks = assistant.chunk_count()?;

    if json {
        println!(
            "{{\"collection\":\"{}\",\"chunks\":{chunks},\"docs_dir\":\"{}\",\"index_dir\":\"{}\",\"embedding_model\":\"{}\",\"llm_model\":\"{}\"}}",
            config.collection,
            config.docs_dir.display(),
            config.index_dir.display(),
            config.embedding_model,
            config.llm_model
        );
    } else {
        println!("Collection: {}", config.collection);
        println!("Chunks: {chunks}");
        println!("Documents directory: {}", config.docs_dir.display());
        println!("Index directory: {}", config.index_dir.display());
        println!("Embedding model: {}", config.embedding_model);
        println!("Generation model: {}", config.llm_model);
    }
    Ok(())
}
