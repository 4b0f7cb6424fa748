use clap::Subcommand;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::services::users::NewUser;
use crate::services::UserService;
use crate::tenancy::{context::run_as, Actor};

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Create a user account in a company")]
    Create {
        #[arg(long, help = "Company ID")]
        company: i64,

        #[arg(long, help = "Login name, unique across companies")]
        username: String,

        #[arg(long, help = "Initial password")]
        password: String,

        #[arg(long, default_value = "", help = "Display name")]
        name: String,

        #[arg(long, help = "Grant access to every company")]
        superuser: bool,
    },
}

pub async fn handle(cmd: UserCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let service = UserService::new(open_store().await?);

    match cmd {
        UserCommands::Create {
            company,
            username,
            password,
            name,
            superuser,
        } => {
            let new_user = NewUser {
                company_id: company,
                username,
                password,
                name,
                is_superuser: superuser,
            };
            let user = run_as(Actor::system(), service.create_user(new_user)).await?;
            output_success(
                &output_format,
                &format!("Created user '{}' in company {}", user.username, company),
                Some(user.to_public()),
            )
        }
    }
}
