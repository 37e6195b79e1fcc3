pub mod pricing;
pub mod recommendation;

use crate::domain::draft::QuestionnaireAnswers;
use crate::domain::license::LicenseMix;

use self::{
    pricing::{LinearPricingEngine, PricingEngine, PricingResult},
    recommendation::{FiveFactorHeuristic, RecommendationHeuristic},
};

pub trait CpqRuntime: Send + Sync {
    fn recommend(&self, team_size: u32, answers: &QuestionnaireAnswers) -> LicenseMix;
    fn price(&self, licenses: LicenseMix) -> PricingResult;
}

pub struct DeterministicCpqRuntime<H, P> {
    heuristic: H,
    pricing_engine: P,
}

impl<H, P> DeterministicCpqRuntime<H, P> {
    pub fn new(heuristic: H, pricing_engine: P) -> Self {
        Self { heuristic, pricing_engine }
    }
}

impl Default for DeterministicCpqRuntime<FiveFactorHeuristic, LinearPricingEngine> {
    fn default() -> Self {
        Self::new(FiveFactorHeuristic, LinearPricingEngine)
    }
}

impl<H, P> CpqRuntime for DeterministicCpqRuntime<H, P>
where
    H: RecommendationHeuristic,
    P: PricingEngine,
{
    fn recommend(&self, team_size: u32, answers: &QuestionnaireAnswers) -> LicenseMix {
        self.heuristic.recommend(team_size, answers)
    }

    fn price(&self, licenses: LicenseMix) -> PricingResult {
        self.pricing_engine.price(licenses)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        cpq::{
            pricing::{LinearPricingEngine, PricingEngine, PricingResult},
            recommendation::RecommendationHeuristic,
            CpqRuntime, DeterministicCpqRuntime,
        },
        domain::{draft::QuestionnaireAnswers, license::LicenseMix},
    };

    #[test]
    fn default_runtime_recommends_and_prices() {
        let runtime = DeterministicCpqRuntime::default();

        let mix = runtime.recommend(10, &QuestionnaireAnswers::default());
        let pricing = runtime.price(mix);

        assert_eq!(mix.seats(), 10);
        assert_eq!(pricing.total, 1_000 * u64::from(mix.enterprise) + 2_000 * u64::from(mix.cascade));
    }

    #[test]
    fn runtime_supports_explicit_engine_interfaces() {
        struct AllEnterprise;

        impl RecommendationHeuristic for AllEnterprise {
            fn recommend(&self, team_size: u32, _answers: &QuestionnaireAnswers) -> LicenseMix {
                LicenseMix::new(team_size, 0)
            }
        }

        struct FlatPricing;

        impl PricingEngine for FlatPricing {
            fn price(&self, licenses: LicenseMix) -> PricingResult {
                let mut result = LinearPricingEngine.price(licenses);
                result.total = 42;
                result
            }
        }

        let runtime = DeterministicCpqRuntime::new(AllEnterprise, FlatPricing);
        let mix = runtime.recommend(6, &QuestionnaireAnswers::default());

        assert_eq!(mix, LicenseMix::new(6, 0));
        assert_eq!(runtime.price(mix).total, 42);
    }
}
