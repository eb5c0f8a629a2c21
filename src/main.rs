use clap::Parser;
use dotenv::dotenv;
use mailshine::{run_generate, run_init, run_with_config_path};

/// Mailshine - ежедневные дайджесты лучших записей Reddit
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Создать хранилище дайджестов и выйти
    #[arg(long)]
    init: bool,

    /// Сгенерировать дайджест для каждой ленты и выйти
    #[arg(long, conflicts_with = "init")]
    generate: bool,

    /// Порт HTTP-сервера (перекрывает server.port)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from `.env` file into std::env (optional)
    dotenv().ok();

    let args = Args::parse();

    if args.init {
        run_init(&args.config).await
    } else if args.generate {
        run_generate(&args.config).await
    } else {
        run_with_config_path(&args.config, args.port).await
    }
}
