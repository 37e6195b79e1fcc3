use quotewise_core::config::{
    resolve_quote_template, AppConfig, CrmConfig, ExportConfig, LoadOptions, QUOTE_TEMPLATE_NAMES,
};
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Fail { 1 } else { 0 };

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return CommandResult { exit_code, output };
    }

    CommandResult { exit_code, output: render_human(&report) }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_templates(&config.export));
            checks.push(check_pdf_converter(&config.export));
            checks.push(check_crm_credentials(&config.crm));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["quote_template", "pdf_converter", "crm_credentials"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_templates(export: &ExportConfig) -> DoctorCheck {
    let Some(dir) = &export.template_dir else {
        return DoctorCheck {
            name: "quote_template",
            status: CheckStatus::Pass,
            details: "using bundled quote template".to_string(),
        };
    };

    match resolve_quote_template(dir) {
        Some(name) => DoctorCheck {
            name: "quote_template",
            status: CheckStatus::Pass,
            details: format!("`{name}` found in {}", dir.display()),
        },
        None => DoctorCheck {
            name: "quote_template",
            status: CheckStatus::Fail,
            details: format!(
                "none of {} found in {}",
                QUOTE_TEMPLATE_NAMES.join(", "),
                dir.display()
            ),
        },
    }
}

fn check_pdf_converter(export: &ExportConfig) -> DoctorCheck {
    if let Some(path) = &export.wkhtmltopdf_path {
        return if path.is_file() {
            DoctorCheck {
                name: "pdf_converter",
                status: CheckStatus::Pass,
                details: format!("wkhtmltopdf configured at {}", path.display()),
            }
        } else {
            DoctorCheck {
                name: "pdf_converter",
                status: CheckStatus::Fail,
                details: format!("configured wkhtmltopdf path {} does not exist", path.display()),
            }
        };
    }

    match which::which("wkhtmltopdf") {
        Ok(path) => DoctorCheck {
            name: "pdf_converter",
            status: CheckStatus::Pass,
            details: format!("wkhtmltopdf found at {}", path.display()),
        },
        Err(_) => DoctorCheck {
            name: "pdf_converter",
            status: CheckStatus::Warn,
            details: "wkhtmltopdf not found in PATH; quotes will be served as printable HTML"
                .to_string(),
        },
    }
}

fn check_crm_credentials(crm: &CrmConfig) -> DoctorCheck {
    if !crm.enabled {
        return DoctorCheck {
            name: "crm_credentials",
            status: CheckStatus::Skipped,
            details: "crm.enabled is false; quote submissions are refused".to_string(),
        };
    }

    DoctorCheck {
        name: "crm_credentials",
        status: CheckStatus::Pass,
        details: format!(
            "credentials configured for `{}` against {}",
            crm.username.as_deref().unwrap_or("<unset>"),
            crm.token_url()
        ),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
