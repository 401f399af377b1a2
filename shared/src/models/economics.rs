//! Economic impact models
//!
//! Every figure here is derived from grid statistics and static crop/cost
//! configuration; nothing is independently settable.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Field areas in hectares
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AreaBreakdown {
    pub total_area: Decimal,
    pub infected_area: Decimal,
    pub healthy_area: Decimal,
    pub infection_percentage: Decimal,
}

/// Yield scenarios in kilograms
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct YieldData {
    /// Whole field, zero infection
    pub perfect_yield: Decimal,
    pub yield_loss_untreated: Decimal,
    pub yield_loss_treated: Decimal,
    pub total_yield_untreated: Decimal,
    pub total_yield_treated: Decimal,
    pub yield_saved_by_treatment: Decimal,
}

/// Revenue scenarios in currency units
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinancialData {
    pub perfect_revenue: Decimal,
    pub revenue_untreated: Decimal,
    pub revenue_treated: Decimal,
    pub financial_loss_untreated: Decimal,
    pub financial_loss_treated: Decimal,
    pub money_saved_by_treatment: Decimal,
}

/// Precision (infected cells only) vs blanket (whole field) treatment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InterventionCosts {
    pub precision: Decimal,
    pub blanket: Decimal,
    pub savings: Decimal,
    pub savings_percentage: Decimal,
    pub chemical_precision_liters: Decimal,
    pub chemical_blanket_liters: Decimal,
    pub chemical_saved_liters: Decimal,
    pub chemical_saved_percentage: Decimal,
}

/// Return on one precision application
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoiPerApplication {
    pub benefit: Decimal,
    pub cost: Decimal,
    pub net_benefit: Decimal,
    pub roi_percentage: Decimal,
}

/// Per-application figures scaled by applications per season
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoiSeasonal {
    pub applications: u32,
    pub benefit: Decimal,
    pub cost: Decimal,
    pub net_benefit: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BreakEven {
    /// cost / benefit; None when treating protects nothing
    pub applications: Option<Decimal>,
    pub profitable_from_first_application: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoiData {
    pub per_application: RoiPerApplication,
    pub seasonal: RoiSeasonal,
    pub break_even: BreakEven,
}

/// Cost/benefit justification for a precision spray mission.
///
/// `has_infection == false` leaves every nested record `None`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EconomicImpact {
    pub has_infection: bool,
    pub full_field_infected: bool,
    pub areas: Option<AreaBreakdown>,
    pub yield_data: Option<YieldData>,
    pub financial_data: Option<FinancialData>,
    pub intervention_costs: Option<InterventionCosts>,
    pub roi: Option<RoiData>,
}

impl EconomicImpact {
    pub fn no_infection() -> Self {
        Self {
            has_infection: false,
            full_field_infected: false,
            areas: None,
            yield_data: None,
            financial_data: None,
            intervention_costs: None,
            roi: None,
        }
    }

    pub fn net_benefit(&self) -> Option<Decimal> {
        self.roi.as_ref().map(|r| r.per_application.net_benefit)
    }

    pub fn roi_percentage(&self) -> Option<Decimal> {
        self.roi.as_ref().map(|r| r.per_application.roi_percentage)
    }
}
