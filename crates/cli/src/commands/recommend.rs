use clap::Args;
use quotewise_core::cpq::pricing::price;
use quotewise_core::cpq::recommendation::{cascade_percentage, recommend};
use quotewise_core::domain::draft::{LanguageCount, QuestionnaireAnswers, YesNo};
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Debug, Clone, Args)]
pub struct QuestionnaireArgs {
    #[arg(long, default_value_t = 50, help = "Share of proprietary code, 0-100")]
    pub proprietary_code: u8,
    #[arg(long, default_value_t = 3, help = "Importance of code completion, 1-5")]
    pub completion_importance: u8,
    #[arg(long, help = "Developers regularly work across multiple repositories")]
    pub multi_repo: bool,
    #[arg(long, default_value = "1-3", help = "Programming languages in use: 1-3, 4-6 or 7+")]
    pub languages: LanguageCount,
    #[arg(long, help = "Enterprise security features are required")]
    pub enterprise_security: bool,
}

impl Default for QuestionnaireArgs {
    fn default() -> Self {
        let answers = QuestionnaireAnswers::default();
        Self {
            proprietary_code: answers.proprietary_code_percentage,
            completion_importance: answers.code_completion_importance,
            multi_repo: answers.multi_repo_work.is_yes(),
            languages: answers.programming_languages,
            enterprise_security: answers.needs_enterprise_security.is_yes(),
        }
    }
}

impl QuestionnaireArgs {
    pub fn answers(&self) -> QuestionnaireAnswers {
        QuestionnaireAnswers {
            proprietary_code_percentage: self.proprietary_code,
            code_completion_importance: self.completion_importance,
            multi_repo_work: yes_no(self.multi_repo),
            programming_languages: self.languages,
            needs_enterprise_security: yes_no(self.enterprise_security),
        }
    }
}

fn yes_no(flag: bool) -> YesNo {
    if flag {
        YesNo::Yes
    } else {
        YesNo::No
    }
}

#[derive(Debug, Clone, Args)]
pub struct RecommendArgs {
    #[arg(long, help = "Number of developers to license")]
    pub team_size: u32,
    #[command(flatten)]
    pub questionnaire: QuestionnaireArgs,
}

#[derive(Debug, Serialize)]
struct Recommendation {
    team_size: u32,
    cascade_percentage: f64,
    enterprise: u32,
    cascade: u32,
    total_cost: u64,
}

pub fn run(args: &RecommendArgs) -> CommandResult {
    let answers = args.questionnaire.answers();
    let issues = answers.range_issues();
    if !issues.is_empty() {
        let message =
            issues.iter().map(|issue| issue.message.as_str()).collect::<Vec<_>>().join(" ");
        return CommandResult::failure("recommend", "validation", message, 2);
    }

    let mix = recommend(args.team_size, &answers);
    CommandResult::report(
        "recommend",
        &Recommendation {
            team_size: args.team_size,
            cascade_percentage: cascade_percentage(&answers),
            enterprise: mix.enterprise,
            cascade: mix.cascade,
            total_cost: price(mix.enterprise, mix.cascade),
        },
    )
}
