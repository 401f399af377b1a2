//! Economic impact model
//!
//! A chain of pure stages (areas → yield → revenue → intervention cost →
//! ROI), each consuming the previous stage's output. All figures are
//! `Decimal` so currency never picks up binary rounding noise.

use rust_decimal::Decimal;
use shared::{
    AreaBreakdown, BreakEven, EconomicImpact, FinancialData, GridStats, InterventionCosts,
    RoiData, RoiPerApplication, RoiSeasonal, YieldData,
};

use crate::config::Config;

/// Decimal places kept on percentages and ratios
const PERCENT_DP: u32 = 2;

/// Static crop and cost parameters, copied out of the mission config
#[derive(Debug, Clone)]
pub struct EconomicParameters {
    pub total_area_hectares: Decimal,
    pub cell_area_hectares: Decimal,
    pub yield_per_hectare: Decimal,
    pub price_per_kg: Decimal,
    pub loss_percentage_untreated: Decimal,
    pub loss_percentage_treated: Decimal,
    pub cost_per_hectare: Decimal,
    pub fixed_cost_per_mission: Decimal,
    pub applications_per_season: u32,
    pub chemical_per_hectare: Decimal,
}

impl EconomicParameters {
    pub fn from_config(config: &Config) -> Self {
        Self {
            total_area_hectares: config.field.total_area_hectares,
            cell_area_hectares: config.cell_area_hectares(),
            yield_per_hectare: config.crop.yield_per_hectare,
            price_per_kg: config.crop.price_per_kg,
            loss_percentage_untreated: config.disease.loss_percentage_untreated,
            loss_percentage_treated: config.disease.loss_percentage_treated,
            cost_per_hectare: config.intervention.cost_per_hectare,
            fixed_cost_per_mission: config.intervention.fixed_cost_per_mission,
            applications_per_season: config.intervention.applications_per_season,
            chemical_per_hectare: config.environmental.chemical_per_hectare,
        }
    }
}

/// Economic impact service
#[derive(Debug, Clone)]
pub struct EconomicImpactService {
    params: EconomicParameters,
}

impl EconomicImpactService {
    pub fn new(params: EconomicParameters) -> Self {
        Self { params }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(EconomicParameters::from_config(config))
    }

    pub fn parameters(&self) -> &EconomicParameters {
        &self.params
    }

    /// Full cost/benefit justification for the current grid
    pub fn calculate(&self, stats: &GridStats) -> EconomicImpact {
        if !stats.has_infection() {
            return EconomicImpact::no_infection();
        }

        let full_field_infected = stats.is_fully_infected();
        if full_field_infected {
            tracing::warn!(
                infected = stats.infected_count,
                "Full field infected, precision spraying offers no savings over blanket treatment"
            );
        }

        let areas = self.calculate_areas(stats.infected_count);
        let yield_data = self.calculate_yield(&areas);
        let financial_data = self.calculate_financials(&yield_data);
        let intervention_costs = self.calculate_intervention_costs(&areas);
        let roi = self.calculate_roi(&yield_data, &intervention_costs);

        if roi.per_application.net_benefit < Decimal::ZERO {
            tracing::warn!(
                net_benefit = %roi.per_application.net_benefit,
                "Treatment costs more than the yield it protects"
            );
        }

        tracing::debug!(
            infected_area = %areas.infected_area,
            net_benefit = %roi.per_application.net_benefit,
            roi_percentage = %roi.per_application.roi_percentage,
            "Economic impact computed"
        );

        EconomicImpact {
            has_infection: true,
            full_field_infected,
            areas: Some(areas),
            yield_data: Some(yield_data),
            financial_data: Some(financial_data),
            intervention_costs: Some(intervention_costs),
            roi: Some(roi),
        }
    }

    pub fn calculate_areas(&self, infected_cells: usize) -> AreaBreakdown {
        let total_area = self.params.total_area_hectares;
        let infected_area =
            (Decimal::from(infected_cells as u64) * self.params.cell_area_hectares).min(total_area);

        AreaBreakdown {
            total_area,
            infected_area,
            healthy_area: total_area - infected_area,
            infection_percentage: percentage(infected_area, total_area),
        }
    }

    pub fn calculate_yield(&self, areas: &AreaBreakdown) -> YieldData {
        let yph = self.params.yield_per_hectare;
        let perfect_yield = areas.total_area * yph;
        let infected_yield = areas.infected_area * yph;

        let yield_loss_untreated =
            infected_yield * self.params.loss_percentage_untreated / Decimal::ONE_HUNDRED;
        let yield_loss_treated =
            infected_yield * self.params.loss_percentage_treated / Decimal::ONE_HUNDRED;

        let total_yield_untreated = perfect_yield - yield_loss_untreated;
        let total_yield_treated = perfect_yield - yield_loss_treated;

        YieldData {
            perfect_yield,
            yield_loss_untreated,
            yield_loss_treated,
            total_yield_untreated,
            total_yield_treated,
            yield_saved_by_treatment: total_yield_treated - total_yield_untreated,
        }
    }

    pub fn calculate_financials(&self, yield_data: &YieldData) -> FinancialData {
        let price = self.params.price_per_kg;
        let revenue_untreated = yield_data.total_yield_untreated * price;
        let revenue_treated = yield_data.total_yield_treated * price;

        FinancialData {
            perfect_revenue: yield_data.perfect_yield * price,
            revenue_untreated,
            revenue_treated,
            financial_loss_untreated: yield_data.yield_loss_untreated * price,
            financial_loss_treated: yield_data.yield_loss_treated * price,
            money_saved_by_treatment: revenue_treated - revenue_untreated,
        }
    }

    pub fn calculate_intervention_costs(&self, areas: &AreaBreakdown) -> InterventionCosts {
        let fixed = self.params.fixed_cost_per_mission;
        let precision = fixed + areas.infected_area * self.params.cost_per_hectare;
        let blanket = fixed + areas.total_area * self.params.cost_per_hectare;
        let savings = blanket - precision;

        let chemical_precision_liters = areas.infected_area * self.params.chemical_per_hectare;
        let chemical_blanket_liters = areas.total_area * self.params.chemical_per_hectare;
        let chemical_saved_liters = chemical_blanket_liters - chemical_precision_liters;

        InterventionCosts {
            precision,
            blanket,
            savings,
            savings_percentage: percentage(savings, blanket),
            chemical_precision_liters,
            chemical_blanket_liters,
            chemical_saved_liters,
            chemical_saved_percentage: percentage(chemical_saved_liters, chemical_blanket_liters),
        }
    }

    pub fn calculate_roi(&self, yield_data: &YieldData, costs: &InterventionCosts) -> RoiData {
        let benefit = yield_data.yield_saved_by_treatment * self.params.price_per_kg;
        let cost = costs.precision;
        let net_benefit = benefit - cost;

        let applications = self.params.applications_per_season;
        let season = Decimal::from(applications);

        // None when treating protects nothing
        let break_even = if benefit > Decimal::ZERO {
            cost.checked_div(benefit)
        } else {
            None
        };

        RoiData {
            per_application: RoiPerApplication {
                benefit,
                cost,
                net_benefit,
                roi_percentage: percentage(net_benefit, cost),
            },
            seasonal: RoiSeasonal {
                applications,
                benefit: benefit * season,
                cost: cost * season,
                net_benefit: net_benefit * season,
            },
            break_even: BreakEven {
                applications: break_even.map(|ratio| ratio.round_dp(PERCENT_DP)),
                profitable_from_first_application: break_even
                    .map(|ratio| ratio < Decimal::ONE)
                    .unwrap_or(false),
            },
        }
    }
}

/// part / whole × 100, rounded; zero when `whole` is zero
fn percentage(part: Decimal, whole: Decimal) -> Decimal {
    part.checked_div(whole)
        .map(|ratio| (ratio * Decimal::ONE_HUNDRED).round_dp(PERCENT_DP))
        .unwrap_or(Decimal::ZERO)
}
