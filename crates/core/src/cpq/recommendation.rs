//! License mix recommendation from questionnaire answers.
//!
//! The five-factor formula is the official heuristic. Each answer shifts the
//! share of Cascade seats; the remainder of the team gets Enterprise seats.

use crate::domain::draft::{LanguageCount, QuestionnaireAnswers};
use crate::domain::license::LicenseMix;

// Weights in fifths of a percent so every answer contributes a whole number.
const FIFTHS_PER_PERCENT: u32 = 5;
const MAX_FIFTHS: u32 = 100 * FIFTHS_PER_PERCENT;
const CODE_COMPLETION_FIFTHS_PER_POINT: u32 = 15;
const MULTI_REPO_BONUS: u32 = 25 * FIFTHS_PER_PERCENT;
const FOUR_TO_SIX_LANGUAGES_BONUS: u32 = 15 * FIFTHS_PER_PERCENT;
const SEVEN_PLUS_LANGUAGES_BONUS: u32 = 25 * FIFTHS_PER_PERCENT;
const ENTERPRISE_SECURITY_PENALTY: u32 = 10 * FIFTHS_PER_PERCENT;

pub trait RecommendationHeuristic: Send + Sync {
    fn recommend(&self, team_size: u32, answers: &QuestionnaireAnswers) -> LicenseMix;
}

#[derive(Clone, Debug, Default)]
pub struct FiveFactorHeuristic;

impl RecommendationHeuristic for FiveFactorHeuristic {
    fn recommend(&self, team_size: u32, answers: &QuestionnaireAnswers) -> LicenseMix {
        recommend(team_size, answers)
    }
}

/// Cascade share in fifths of a percent, clamped to `[0, 500]`.
///
/// `proprietary / 100 * 20` percent is `proprietary` fifths and
/// `importance / 5 * 15` percent is `15 * importance` fifths.
pub fn cascade_fifths(answers: &QuestionnaireAnswers) -> u32 {
    let mut fifths = u32::from(answers.proprietary_code_percentage)
        + CODE_COMPLETION_FIFTHS_PER_POINT * u32::from(answers.code_completion_importance);

    if answers.multi_repo_work.is_yes() {
        fifths += MULTI_REPO_BONUS;
    }

    fifths += match answers.programming_languages {
        LanguageCount::OneToThree => 0,
        LanguageCount::FourToSix => FOUR_TO_SIX_LANGUAGES_BONUS,
        LanguageCount::SevenPlus => SEVEN_PLUS_LANGUAGES_BONUS,
    };

    if answers.needs_enterprise_security.is_yes() {
        fifths = fifths.saturating_sub(ENTERPRISE_SECURITY_PENALTY);
    }

    fifths.min(MAX_FIFTHS)
}

/// Cascade share of the team in percent, clamped to `[0, 100]`.
pub fn cascade_percentage(answers: &QuestionnaireAnswers) -> f64 {
    f64::from(cascade_fifths(answers)) / f64::from(FIFTHS_PER_PERCENT)
}

/// Splits `team_size` seats; the two counts always sum to `team_size`.
pub fn recommend(team_size: u32, answers: &QuestionnaireAnswers) -> LicenseMix {
    if team_size == 0 {
        return LicenseMix::default();
    }

    // round(fifths / 500 * team), halves up, in exact integers.
    let fifths = u64::from(cascade_fifths(answers));
    let max = u64::from(MAX_FIFTHS);
    let cascade = (2 * fifths * u64::from(team_size) + max) / (2 * max);
    let cascade = u32::try_from(cascade).map_or(team_size, |cascade| cascade.min(team_size));

    LicenseMix::new(team_size - cascade, cascade)
}

#[cfg(test)]
mod tests {
    use crate::domain::draft::{LanguageCount, QuestionnaireAnswers, YesNo};
    use crate::domain::license::LicenseMix;

    use super::{
        cascade_fifths, cascade_percentage, recommend, FiveFactorHeuristic,
        RecommendationHeuristic,
    };

    fn all_answer_combinations() -> Vec<QuestionnaireAnswers> {
        let mut combos = Vec::new();
        for proprietary in [0u8, 1, 33, 50, 67, 99, 100] {
            for importance in 1u8..=5 {
                for multi_repo in [YesNo::Yes, YesNo::No] {
                    for languages in
                        [LanguageCount::OneToThree, LanguageCount::FourToSix, LanguageCount::SevenPlus]
                    {
                        for security in [YesNo::Yes, YesNo::No] {
                            combos.push(QuestionnaireAnswers {
                                proprietary_code_percentage: proprietary,
                                code_completion_importance: importance,
                                multi_repo_work: multi_repo,
                                programming_languages: languages,
                                needs_enterprise_security: security,
                            });
                        }
                    }
                }
            }
        }
        combos
    }

    #[test]
    fn high_signal_answers_recommend_mostly_cascade() {
        let answers = QuestionnaireAnswers {
            proprietary_code_percentage: 100,
            code_completion_importance: 5,
            multi_repo_work: YesNo::Yes,
            programming_languages: LanguageCount::SevenPlus,
            needs_enterprise_security: YesNo::No,
        };

        assert_eq!(cascade_percentage(&answers), 85.0);
        assert_eq!(recommend(20, &answers), LicenseMix::new(3, 17));
    }

    #[test]
    fn zero_team_size_short_circuits() {
        assert_eq!(recommend(0, &QuestionnaireAnswers::default()), LicenseMix::new(0, 0));
    }

    #[test]
    fn security_penalty_cannot_push_percentage_below_zero() {
        let answers = QuestionnaireAnswers {
            proprietary_code_percentage: 0,
            code_completion_importance: 1,
            multi_repo_work: YesNo::No,
            programming_languages: LanguageCount::OneToThree,
            needs_enterprise_security: YesNo::Yes,
        };

        assert_eq!(cascade_percentage(&answers), 0.0);
        assert_eq!(recommend(9, &answers), LicenseMix::new(9, 0));
    }

    #[test]
    fn defaults_recommend_a_fifth_cascade() {
        // 50% proprietary -> 10, importance 3 -> 9
        let answers = QuestionnaireAnswers::default();
        assert_eq!(cascade_percentage(&answers), 19.0);
        assert_eq!(recommend(10, &answers), LicenseMix::new(8, 2));
    }

    #[test]
    fn halves_round_away_from_zero() {
        // 25% of 2 seats is exactly 0.5 -> rounds up to 1 cascade seat.
        let answers = QuestionnaireAnswers {
            proprietary_code_percentage: 50,
            code_completion_importance: 5,
            multi_repo_work: YesNo::No,
            programming_languages: LanguageCount::OneToThree,
            needs_enterprise_security: YesNo::No,
        };

        assert_eq!(cascade_percentage(&answers), 25.0);
        assert_eq!(recommend(2, &answers), LicenseMix::new(1, 1));
    }

    #[test]
    fn fractional_percentages_round_half_up_exactly() {
        // 1/5 + 3 + 15 - 10 = 8.2%; 8.2% of 250 seats is exactly 20.5.
        let answers = QuestionnaireAnswers {
            proprietary_code_percentage: 1,
            code_completion_importance: 1,
            multi_repo_work: YesNo::No,
            programming_languages: LanguageCount::FourToSix,
            needs_enterprise_security: YesNo::Yes,
        };

        assert_eq!(cascade_fifths(&answers), 41);
        assert_eq!(recommend(250, &answers), LicenseMix::new(229, 21));
    }

    #[test]
    fn split_matches_exact_rational_rounding() {
        for answers in all_answer_combinations() {
            let fifths = u64::from(cascade_fifths(&answers));
            for team_size in 1u32..=400 {
                // 500 * cascade must land within half a step of fifths * team.
                let exact = fifths * u64::from(team_size);
                let cascade = u64::from(recommend(team_size, &answers).cascade);
                let scaled = cascade * 500;
                assert!(
                    scaled + 250 > exact && scaled <= exact + 250,
                    "team {team_size} with {answers:?} gave {cascade} cascade seats"
                );
            }
        }
    }

    #[test]
    fn counts_always_sum_to_team_size() {
        let heuristic = FiveFactorHeuristic;
        let combos = all_answer_combinations();
        for team_size in (1..=200).chain([999, 10_000, u32::MAX]) {
            for answers in &combos {
                let mix = heuristic.recommend(team_size, answers);
                assert_eq!(
                    mix.seats(),
                    u64::from(team_size),
                    "team {team_size} with {answers:?} produced {mix:?}"
                );
            }
        }
    }
}
