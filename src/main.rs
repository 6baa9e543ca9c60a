/*
 * idgctl - IBM DataPower Gateway domain automation
 * Copyright (c) 2024 SampleFarm Project
 *
 * This work is licensed under CC BY-NC-SA 4.0
 * https://creativecommons.org/licenses/by-nc-sa/4.0/
 */

use base64::{Engine, engine::general_purpose::STANDARD};
use clap::{Args, Parser, Subcommand};
use idgctl::{
    config::Config,
    error::{AppError, AppResult},
    handlers::{
        AppState, CheckpointParams, CheckpointState, DomainConfigParams, DomainConfigState,
        checkpoint, domain_config, domain_discovery,
    },
    models::{ActionReport, TaskResult},
};
use std::{path::PathBuf, process::ExitCode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_CONFIG_FILE: &str = "idgctl.toml";

#[derive(Parser)]
#[command(
    name = "idgctl",
    about = "通过 REST 管理接口驱动 IBM DataPower Gateway 的域操作",
    version
)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

/// 覆盖配置文件中的连接参数
#[derive(Args)]
struct ConnectionArgs {
    /// 配置文件路径（默认读取当前目录下的 idgctl.toml）
    #[arg(long, global = true, env = "IDGCTL_CONFIG")]
    config: Option<PathBuf>,

    /// 设备地址
    #[arg(long, global = true)]
    server: Option<String>,

    /// REST 管理接口端口
    #[arg(long, global = true)]
    port: Option<u16>,

    #[arg(long, global = true)]
    user: Option<String>,

    #[arg(long, global = true, env = "IDG_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// 不校验设备证书
    #[arg(long, global = true)]
    insecure: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// 管理域检查点
    Checkpoint {
        #[arg(long)]
        domain: String,

        /// 检查点名称
        #[arg(long)]
        name: String,

        #[arg(long, value_enum, default_value_t = CheckpointState::Present)]
        state: CheckpointState,
    },

    /// 导出、导入、重置、保存域配置，或写入文件存储
    Config(DomainConfigArgs),

    /// 列出设备上的域
    Discover,

    /// 写出默认配置文件
    InitConfig {
        #[arg(default_value = DEFAULT_CONFIG_FILE)]
        path: PathBuf,
    },
}

#[derive(Args)]
struct DomainConfigArgs {
    /// 域名称
    #[arg(long)]
    name: String,

    #[arg(long, value_enum)]
    state: DomainConfigState,

    /// 导出备注
    #[arg(long)]
    user_summary: Option<String>,

    #[arg(long)]
    all_files: bool,

    #[arg(long)]
    persisted: bool,

    /// 导出时不包含内部文件
    #[arg(long)]
    no_internal_files: bool,

    /// base64 编码的文件内容
    #[arg(long, conflicts_with = "input_path")]
    input_file: Option<String>,

    /// 读取本地文件并进行 base64 编码
    #[arg(long)]
    input_path: Option<PathBuf>,

    /// 文件存储中的目标路径
    #[arg(long)]
    output_path: Option<String>,

    #[arg(long)]
    overwrite_files: bool,

    #[arg(long)]
    overwrite_objects: bool,

    #[arg(long)]
    dry_run: bool,

    #[arg(long)]
    rewrite_local_ip: bool,

    #[arg(long)]
    deployment_policy: Option<String>,

    #[arg(long)]
    deployment_policy_params: Option<String>,

    #[arg(long, default_value = "ZIP")]
    import_format: String,

    /// 把导出文件解码后写入本地路径
    #[arg(long)]
    export_to: Option<PathBuf>,
}

impl DomainConfigArgs {
    fn into_params(self) -> AppResult<(DomainConfigParams, Option<PathBuf>)> {
        let input_file = match (&self.input_file, &self.input_path) {
            (Some(content), _) => Some(content.clone()),
            (None, Some(path)) => Some(STANDARD.encode(std::fs::read(path)?)),
            (None, None) => None,
        };

        let params = DomainConfigParams {
            user_summary: self.user_summary,
            all_files: self.all_files,
            persisted: self.persisted,
            internal_files: !self.no_internal_files,
            input_file,
            output_path: self.output_path,
            overwrite_files: self.overwrite_files,
            overwrite_objects: self.overwrite_objects,
            dry_run: self.dry_run,
            rewrite_local_ip: self.rewrite_local_ip,
            deployment_policy: self.deployment_policy,
            deployment_policy_params: self.deployment_policy_params,
            import_format: self.import_format,
            ..DomainConfigParams::new(self.name, self.state)
        };
        Ok((params, self.export_to))
    }
}

/// 加载配置并应用命令行覆盖
fn load_config(cli: &ConnectionArgs) -> AppResult<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None if std::path::Path::new(DEFAULT_CONFIG_FILE).exists() => {
            Config::from_file(DEFAULT_CONFIG_FILE)?
        }
        None => {
            tracing::debug!("未找到配置文件，使用默认配置");
            Config::default()
        }
    };

    if let Some(server) = &cli.server {
        config.connection.server = server.clone();
    }
    if let Some(port) = cli.port {
        config.connection.server_port = port;
    }
    if let Some(user) = &cli.user {
        config.connection.user = user.clone();
    }
    if let Some(password) = &cli.password {
        config.connection.password = password.clone();
    }
    if cli.insecure {
        config.connection.validate_certs = false;
    }

    config.validate()?;
    Ok(config)
}

fn connect(args: &ConnectionArgs) -> AppResult<AppState> {
    let config = load_config(args)?;
    tracing::info!("设备地址: {}", config.connection.base_url());
    AppState::from_config(&config)
}

async fn execute(cli: Cli) -> AppResult<TaskResult> {
    match cli.command {
        Commands::InitConfig { path } => {
            Config::default().save_to_file(&path)?;
            tracing::info!("已写入默认配置: {}", path.display());
            Ok(TaskResult::default()
                .with_report(ActionReport::changed(format!("已写入 {}", path.display()))))
        }
        Commands::Checkpoint {
            domain,
            name,
            state,
        } => {
            let app = connect(&cli.connection)?;
            let params = CheckpointParams {
                domain,
                name,
                state,
            };
            Ok(checkpoint::run(&app, &params).await)
        }
        Commands::Config(args) => {
            let app = connect(&cli.connection)?;
            let (params, export_to) = args.into_params()?;
            let result = domain_config::run(&app, &params).await;
            if let (Some(path), Some(file)) = (&export_to, &result.file) {
                let bytes = STANDARD
                    .decode(file)
                    .map_err(|e| AppError::validation(format!("导出文件不是有效的 base64: {}", e)))?;
                std::fs::write(path, bytes)?;
                tracing::info!("导出文件已写入: {}", path.display());
            }
            Ok(result)
        }
        Commands::Discover => {
            let app = connect(&cli.connection)?;
            Ok(domain_discovery::run(&app).await)
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<ExitCode> {
    // 初始化日志，输出到 stderr，stdout 只保留结果记录
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "idgctl=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let result = match execute(cli).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("执行失败: {}", e);
            TaskResult::default().with_error(&e)
        }
    };

    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(if result.is_failed() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
