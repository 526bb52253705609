// Interactive add / edit / update / delete / post loop of a sales voucher.
//
// States: Idle (nothing composed), Composing (form populated), Editing(i)
// (committed line i loaded back into the form) and PostedLocked (terminal).
// Every mutating transition is rejected once the voucher is posted, and a
// rejected transition leaves the session untouched.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::money::round_money;
use crate::core::{AppError, Result, SelectableOption};
use crate::modules::pricing::models::{
    CustomerProfile, CustomerType, DiscountOverride, DiscountOverrides, DiscountRule,
    DiscountRuleSet, RateEntry, TaxOverride, TaxOverrides, TaxRule, TaxRuleSet,
    TransactionType,
};
use crate::modules::pricing::services::{DiscountEngine, DiscountInputs, TaxEngine, TaxInputs};
use crate::modules::vouchers::models::{
    InvoiceTotals, LedgerProjection, LineItem, SalesVoucher, VoucherHeader, VoucherScope,
};

use super::fetch_guard::{FetchKind, FetchOutcome, FetchTicket, FetchTracker, FetchWarning};
use super::ledger_projector::LedgerProjector;
use super::line_calculator::{LineCalculator, LineDraft};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "index", rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Composing,
    Editing(usize),
    PostedLocked,
}

/// Pricing inputs a committed line was computed from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineInputs {
    pub discounts: DiscountInputs,
    pub tax_rule_sets: Vec<TaxRuleSet>,
    pub tax_overrides: TaxOverrides,
}

impl LineInputs {
    pub fn tax_inputs(&self, invoice_date: NaiveDate) -> TaxInputs {
        TaxInputs {
            rule_sets: self.tax_rule_sets.clone(),
            invoice_date,
            overrides: self.tax_overrides.clone(),
        }
    }

    /// Rebuilds the inputs of a stored line from its breakdowns.
    ///
    /// Tax rules that were omitted for a zero rate are not recoverable and
    /// stay absent.
    pub fn restore(
        item: &LineItem,
        debtor_account_id: &str,
        sub_account_id: &str,
        invoice_date: NaiveDate,
    ) -> Self {
        let mut discounts = DiscountInputs::default();
        if !item.discount_breakdown.is_empty() {
            discounts.rule_sets.push(DiscountRuleSet {
                id: None,
                debtor_account_id: debtor_account_id.to_string(),
                sub_account_id: sub_account_id.to_string(),
                finished_good_id: item.finished_good.id.clone(),
                is_active: true,
                rates: item
                    .discount_breakdown
                    .iter()
                    .map(|entry| DiscountRule {
                        discount_type_id: entry.discount_type_id.clone(),
                        title: entry.title.clone(),
                        discount_type: entry.discount_type,
                        rate: entry.original_rate,
                        is_editable: entry.is_editable,
                    })
                    .collect(),
            });
        }
        for entry in item.discount_breakdown.iter().filter(|e| e.is_edited) {
            let from_rate = entry
                .discount_type
                .value_for(entry.rate, item.amount, item.quantity)
                .map(round_money);
            let edit = if from_rate == Some(entry.value) {
                DiscountOverride::with_rate(entry.rate)
            } else {
                DiscountOverride::with_value(entry.value)
            };
            discounts.overrides.insert(entry.discount_type_id.clone(), edit);
        }

        let mut tax_rule_sets = Vec::new();
        if !item.tax_breakdown.is_empty() {
            tax_rule_sets.push(TaxRuleSet {
                id: None,
                finished_good_id: item.finished_good.id.clone(),
                account_level4_id: item.account_level4.id.clone(),
                applicable_date: invoice_date,
                is_active: true,
                rules: item
                    .tax_breakdown
                    .iter()
                    .map(|entry| TaxRule {
                        tax_type_id: entry.tax_type_id.clone(),
                        title: entry.title.clone(),
                        tax_type: entry.tax_type,
                        registered_value: entry.original_registered_value,
                        unregistered_value: entry.original_unregistered_value,
                        is_editable: entry.is_editable,
                        transaction_type: entry.transaction_type,
                    })
                    .collect(),
            });
        }
        let mut tax_overrides = TaxOverrides::new();
        for entry in item.tax_breakdown.iter().filter(|e| e.is_edited) {
            let mut edit = TaxOverride {
                editable: true,
                ..TaxOverride::default()
            };
            if entry.registered_value != entry.original_registered_value {
                edit.edited_registered_rate = Some(entry.registered_value);
            }
            if entry.unregistered_value != entry.original_unregistered_value {
                edit.edited_unregistered_rate = Some(entry.unregistered_value);
            }
            if entry.current_rate != entry.registered_value
                && entry.current_rate != entry.unregistered_value
            {
                edit.edited_value = Some(entry.value);
            }
            tax_overrides.insert(entry.tax_type_id.clone(), edit);
        }

        Self {
            discounts,
            tax_rule_sets,
            tax_overrides,
        }
    }
}

/// Fields of the line being composed or edited
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineForm {
    pub finished_good: Option<SelectableOption>,
    pub account_level4: Option<SelectableOption>,
    pub unit_measurement: Option<SelectableOption>,
    pub quantity: Option<Decimal>,
    pub rate: Option<Decimal>,
    pub rate_info: Option<RateEntry>,
    pub inputs: LineInputs,
}

impl LineForm {
    fn load(item: &LineItem, inputs: &LineInputs) -> Self {
        Self {
            finished_good: Some(item.finished_good.clone()),
            account_level4: Some(item.account_level4.clone()),
            unit_measurement: item.unit_measurement.clone(),
            quantity: Some(item.quantity),
            rate: Some(item.rate),
            rate_info: item.rate_info.clone(),
            inputs: inputs.clone(),
        }
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone)]
struct SessionLine {
    item: LineItem,
    inputs: LineInputs,
}

/// Result of removing a line
#[derive(Debug, Clone, PartialEq)]
pub struct DeletedLine {
    pub item: LineItem,
    /// The voucher has no lines left and is deleted downstream
    pub voucher_emptied: bool,
}

#[derive(Debug, Clone)]
pub struct VoucherEditSession {
    scope: VoucherScope,
    voucher_id: Option<String>,
    voucher_number: Option<String>,
    invoice_date: NaiveDate,
    godown: Option<SelectableOption>,
    debtor_account: Option<SelectableOption>,
    sub_account: Option<SelectableOption>,
    remarks: Option<String>,
    customer_profile: Option<CustomerProfile>,
    default_customer_type: CustomerType,
    form: LineForm,
    lines: Vec<SessionLine>,
    state: SessionState,
    fetches: FetchTracker,
}

impl VoucherEditSession {
    pub fn new(scope: VoucherScope, invoice_date: NaiveDate) -> Self {
        Self {
            scope,
            voucher_id: None,
            voucher_number: None,
            invoice_date,
            godown: None,
            debtor_account: None,
            sub_account: None,
            remarks: None,
            customer_profile: None,
            default_customer_type: CustomerType::default(),
            form: LineForm::default(),
            lines: Vec::new(),
            state: SessionState::Idle,
            fetches: FetchTracker::new(),
        }
    }

    /// Customer type assumed while no customer profile is known
    pub fn with_default_customer_type(mut self, customer_type: CustomerType) -> Self {
        self.default_customer_type = customer_type;
        self
    }

    /// Reopens a stored voucher
    pub fn from_voucher(voucher: SalesVoucher) -> Self {
        let header = voucher.header;
        let lines: Vec<SessionLine> = voucher
            .items
            .into_iter()
            .map(|mut item| {
                item.is_being_edited = false;
                let inputs = LineInputs::restore(
                    &item,
                    &header.debtor_account.id,
                    &header.sub_account.id,
                    header.invoice_date,
                );
                SessionLine { item, inputs }
            })
            .collect();

        let state = if voucher.is_posted {
            SessionState::PostedLocked
        } else if lines.is_empty() {
            SessionState::Idle
        } else {
            SessionState::Composing
        };

        Self {
            scope: header.scope,
            voucher_id: Some(voucher.id),
            voucher_number: Some(header.voucher_number),
            invoice_date: header.invoice_date,
            godown: Some(header.godown),
            debtor_account: Some(header.debtor_account),
            sub_account: Some(header.sub_account),
            remarks: header.remarks,
            customer_profile: None,
            default_customer_type: CustomerType::default(),
            form: LineForm::default(),
            lines,
            state,
            fetches: FetchTracker::new(),
        }
    }

    // Accessors

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_posted(&self) -> bool {
        self.state == SessionState::PostedLocked
    }

    pub fn scope(&self) -> &VoucherScope {
        &self.scope
    }

    pub fn voucher_id(&self) -> Option<&str> {
        self.voucher_id.as_deref()
    }

    pub fn invoice_date(&self) -> NaiveDate {
        self.invoice_date
    }

    pub fn form(&self) -> &LineForm {
        &self.form
    }

    pub fn godown(&self) -> Option<&SelectableOption> {
        self.godown.as_ref()
    }

    pub fn debtor_account(&self) -> Option<&SelectableOption> {
        self.debtor_account.as_ref()
    }

    pub fn sub_account(&self) -> Option<&SelectableOption> {
        self.sub_account.as_ref()
    }

    pub fn customer_profile(&self) -> Option<&CustomerProfile> {
        self.customer_profile.as_ref()
    }

    pub fn customer_type(&self) -> CustomerType {
        self.customer_profile
            .as_ref()
            .map(|profile| profile.customer_type)
            .unwrap_or(self.default_customer_type)
    }

    pub fn items(&self) -> impl Iterator<Item = &LineItem> + '_ {
        self.lines.iter().map(|line| &line.item)
    }

    pub fn item(&self, index: usize) -> Option<&LineItem> {
        self.lines.get(index).map(|line| &line.item)
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line_items(&self) -> Vec<LineItem> {
        self.items().cloned().collect()
    }

    pub fn totals(&self) -> InvoiceTotals {
        InvoiceTotals::from_items(&self.line_items())
    }

    pub fn ledger(&self, projector: &LedgerProjector) -> LedgerProjection {
        projector.project(&self.line_items(), self.sub_account.as_ref())
    }

    /// Header to persist; every header field must be selected
    pub fn header(&self) -> Result<VoucherHeader> {
        let header = VoucherHeader {
            scope: self.scope.clone(),
            voucher_number: self
                .voucher_number
                .clone()
                .ok_or_else(|| AppError::missing_field("Voucher number"))?,
            invoice_date: self.invoice_date,
            godown: self
                .godown
                .clone()
                .ok_or_else(|| AppError::missing_field("Godown"))?,
            debtor_account: self
                .debtor_account
                .clone()
                .ok_or_else(|| AppError::missing_field("Debtor account"))?,
            sub_account: self
                .sub_account
                .clone()
                .ok_or_else(|| AppError::missing_field("Sub account"))?,
            remarks: self.remarks.clone(),
        };
        header.validate()?;
        Ok(header)
    }

    pub(crate) fn set_voucher_id(&mut self, voucher_id: Option<String>) {
        self.voucher_id = voucher_id;
    }

    // Header selections

    pub fn set_voucher_number(&mut self, voucher_number: impl Into<String>) -> Result<()> {
        self.ensure_unlocked()?;
        self.voucher_number = Some(voucher_number.into());
        Ok(())
    }

    pub fn set_invoice_date(&mut self, invoice_date: NaiveDate) -> Result<()> {
        self.ensure_unlocked()?;
        self.invoice_date = invoice_date;
        self.touch();
        Ok(())
    }

    pub fn set_remarks(&mut self, remarks: Option<String>) -> Result<()> {
        self.ensure_unlocked()?;
        self.remarks = remarks;
        Ok(())
    }

    pub fn select_godown(&mut self, godown: Option<SelectableOption>) -> Result<()> {
        self.ensure_unlocked()?;
        self.godown = godown;
        self.touch();
        Ok(())
    }

    /// Changing the debtor clears the sub-account and everything derived from it
    pub fn select_debtor_account(&mut self, debtor: Option<SelectableOption>) -> Result<()> {
        self.ensure_unlocked()?;
        if self.debtor_account != debtor {
            self.sub_account = None;
            self.customer_profile = None;
            self.form.inputs.discounts = DiscountInputs::default();
        }
        self.debtor_account = debtor;
        self.touch();
        Ok(())
    }

    pub fn select_sub_account(&mut self, sub_account: Option<SelectableOption>) -> Result<()> {
        self.ensure_unlocked()?;
        if self.sub_account != sub_account {
            self.customer_profile = None;
            self.form.inputs.discounts = DiscountInputs::default();
        }
        self.sub_account = sub_account;
        self.touch();
        Ok(())
    }

    // Line selections

    pub fn select_finished_good(&mut self, finished_good: Option<SelectableOption>) -> Result<()> {
        self.ensure_unlocked()?;
        if self.form.finished_good != finished_good {
            self.form.account_level4 = None;
            self.form.rate = None;
            self.form.rate_info = None;
            self.form.inputs = LineInputs::default();
        }
        self.form.finished_good = finished_good;
        self.touch();
        Ok(())
    }

    pub fn select_account_level4(&mut self, item: Option<SelectableOption>) -> Result<()> {
        self.ensure_unlocked()?;
        if self.form.account_level4 != item {
            self.form.rate = None;
            self.form.rate_info = None;
            self.form.inputs.tax_rule_sets.clear();
            self.form.inputs.tax_overrides.clear();
        }
        self.form.account_level4 = item;
        self.touch();
        Ok(())
    }

    pub fn select_unit_measurement(&mut self, unit: Option<SelectableOption>) -> Result<()> {
        self.ensure_unlocked()?;
        self.form.unit_measurement = unit;
        self.touch();
        Ok(())
    }

    pub fn set_quantity(&mut self, quantity: Decimal) -> Result<()> {
        self.ensure_unlocked()?;
        self.form.quantity = Some(quantity);
        self.touch();
        Ok(())
    }

    /// Manual rate entry; detaches the line from the rate history
    pub fn set_rate(&mut self, rate: Decimal) -> Result<()> {
        self.ensure_unlocked()?;
        self.form.rate = Some(rate);
        self.form.rate_info = None;
        self.touch();
        Ok(())
    }

    // Discount / tax overrides

    pub fn edit_discount_rate(&mut self, discount_type_id: &str, rate: Decimal) -> Result<()> {
        self.ensure_unlocked()?;
        Self::ensure_not_negative(rate, "Discount rate")?;
        self.editable_discount(discount_type_id)?;
        self.form
            .inputs
            .discounts
            .overrides
            .insert(discount_type_id.to_string(), DiscountOverride::with_rate(rate));
        self.touch();
        Ok(())
    }

    pub fn edit_discount_value(&mut self, discount_type_id: &str, value: Decimal) -> Result<()> {
        self.ensure_unlocked()?;
        Self::ensure_not_negative(value, "Discount value")?;
        self.editable_discount(discount_type_id)?;
        self.form
            .inputs
            .discounts
            .overrides
            .insert(discount_type_id.to_string(), DiscountOverride::with_value(value));
        self.touch();
        Ok(())
    }

    /// Drops the override so the entry returns to its original rate and value
    pub fn reset_discount(&mut self, discount_type_id: &str) -> Result<()> {
        self.ensure_unlocked()?;
        self.form.inputs.discounts.overrides.remove(discount_type_id);
        Ok(())
    }

    /// Edits the rate column of the current customer type only
    pub fn edit_tax_rate(&mut self, tax_type_id: &str, rate: Decimal) -> Result<()> {
        self.ensure_unlocked()?;
        Self::ensure_not_negative(rate, "Tax rate")?;
        self.editable_tax(tax_type_id)?;
        let customer_type = self.customer_type();
        let edit = self
            .form
            .inputs
            .tax_overrides
            .entry(tax_type_id.to_string())
            .or_default();
        edit.set_edited_rate(customer_type, rate);
        edit.edited_value = None;
        self.touch();
        Ok(())
    }

    pub fn edit_tax_value(&mut self, tax_type_id: &str, value: Decimal) -> Result<()> {
        self.ensure_unlocked()?;
        Self::ensure_not_negative(value, "Tax value")?;
        self.editable_tax(tax_type_id)?;
        let edit = self
            .form
            .inputs
            .tax_overrides
            .entry(tax_type_id.to_string())
            .or_default();
        edit.editable = true;
        edit.edited_value = Some(value);
        self.touch();
        Ok(())
    }

    pub fn reset_tax(&mut self, tax_type_id: &str) -> Result<()> {
        self.ensure_unlocked()?;
        self.form.inputs.tax_overrides.remove(tax_type_id);
        Ok(())
    }

    fn editable_discount(&self, discount_type_id: &str) -> Result<()> {
        let rule = DiscountEngine::new()
            .select_active(&self.form.inputs.discounts.rule_sets)
            .and_then(|set| {
                set.rates
                    .iter()
                    .find(|rule| rule.discount_type_id == discount_type_id)
            })
            .ok_or_else(|| {
                AppError::validation(format!(
                    "Discount {} does not apply to this line",
                    discount_type_id
                ))
            })?;
        if !rule.is_editable {
            return Err(AppError::validation(format!(
                "Discount {} is not editable",
                rule.title
            )));
        }
        Ok(())
    }

    fn editable_tax(&self, tax_type_id: &str) -> Result<()> {
        let rule = TaxEngine::new()
            .select_applicable(&self.form.inputs.tax_rule_sets, self.invoice_date)
            .and_then(|set| {
                set.rules.iter().find(|rule| {
                    rule.tax_type_id == tax_type_id
                        && rule.transaction_type == TransactionType::Sale
                })
            })
            .ok_or_else(|| {
                AppError::validation(format!("Tax {} does not apply to this line", tax_type_id))
            })?;
        if !rule.is_editable {
            return Err(AppError::validation(format!(
                "Tax {} is not editable",
                rule.title
            )));
        }
        Ok(())
    }

    fn ensure_not_negative(value: Decimal, field: &str) -> Result<()> {
        if value < Decimal::ZERO {
            return Err(AppError::validation(format!("{} cannot be negative", field)));
        }
        Ok(())
    }

    // Asynchronous lookups

    /// Selector fingerprint a lookup of `kind` depends on, if the selectors
    /// it needs are filled in
    pub fn fingerprint(&self, kind: FetchKind) -> Option<String> {
        match kind {
            FetchKind::Rate => self
                .form
                .account_level4
                .as_ref()
                .map(|item| format!("{}@{}", item.id, self.invoice_date)),
            FetchKind::DiscountRules => {
                match (&self.debtor_account, &self.sub_account, &self.form.finished_good) {
                    (Some(debtor), Some(sub), Some(good)) => {
                        Some(format!("{}|{}|{}", debtor.id, sub.id, good.id))
                    }
                    _ => None,
                }
            }
            FetchKind::TaxRules => match (&self.form.finished_good, &self.form.account_level4) {
                (Some(good), Some(item)) => Some(format!("{}|{}", good.id, item.id)),
                _ => None,
            },
            FetchKind::CustomerProfile => match (&self.debtor_account, &self.sub_account) {
                (Some(debtor), Some(sub)) => Some(format!("{}|{}", debtor.id, sub.id)),
                _ => None,
            },
        }
    }

    /// Issues a ticket for a lookup; `None` while the selectors it needs are
    /// incomplete or the voucher is posted
    pub fn begin_fetch(&mut self, kind: FetchKind) -> Option<FetchTicket> {
        if self.is_posted() {
            return None;
        }
        let fingerprint = self.fingerprint(kind)?;
        Some(self.fetches.issue(kind, fingerprint))
    }

    fn accepts(&self, ticket: &FetchTicket) -> bool {
        let current = self.fingerprint(ticket.kind);
        let accepted = !self.is_posted() && self.fetches.is_current(ticket, current.as_deref());
        if !accepted {
            tracing::debug!(
                kind = %ticket.kind,
                sequence = ticket.sequence,
                "Discarding stale lookup response"
            );
        }
        accepted
    }

    fn failed(kind: FetchKind, err: &AppError) -> FetchOutcome {
        tracing::warn!(kind = %kind, error = %err, "Lookup failed; keeping previous values");
        FetchOutcome::Failed {
            warning: FetchWarning::new(kind, format!("Could not load {}: {}", kind, err)),
        }
    }

    fn degraded(kind: FetchKind, message: String) -> FetchOutcome {
        tracing::warn!(kind = %kind, "{}", message);
        FetchOutcome::Degraded {
            warning: FetchWarning::new(kind, message),
        }
    }

    pub fn apply_rate(&mut self, ticket: &FetchTicket, response: Result<Option<RateEntry>>) -> FetchOutcome {
        if !self.accepts(ticket) {
            return FetchOutcome::Discarded;
        }
        match response {
            Ok(Some(entry)) => {
                self.form.rate = Some(entry.rate);
                self.form.rate_info = Some(entry);
                FetchOutcome::Applied
            }
            Ok(None) | Err(AppError::NotFound(_)) => {
                self.form.rate = Some(Decimal::ZERO);
                self.form.rate_info = None;
                Self::degraded(
                    FetchKind::Rate,
                    format!("No rate applicable on {}; rate set to 0", self.invoice_date),
                )
            }
            Err(err) => Self::failed(FetchKind::Rate, &err),
        }
    }

    pub fn apply_discount_rules(
        &mut self,
        ticket: &FetchTicket,
        response: Result<Vec<DiscountRuleSet>>,
    ) -> FetchOutcome {
        if !self.accepts(ticket) {
            return FetchOutcome::Discarded;
        }
        match response {
            Ok(rule_sets) => {
                self.form.inputs.discounts.rule_sets = rule_sets;
                FetchOutcome::Applied
            }
            Err(AppError::NotFound(_)) => {
                self.form.inputs.discounts = DiscountInputs::default();
                Self::degraded(FetchKind::DiscountRules, "No discounts configured".to_string())
            }
            Err(err) => Self::failed(FetchKind::DiscountRules, &err),
        }
    }

    pub fn apply_tax_rules(
        &mut self,
        ticket: &FetchTicket,
        response: Result<Vec<TaxRuleSet>>,
    ) -> FetchOutcome {
        if !self.accepts(ticket) {
            return FetchOutcome::Discarded;
        }
        match response {
            Ok(rule_sets) => {
                self.form.inputs.tax_rule_sets = rule_sets;
                FetchOutcome::Applied
            }
            Err(AppError::NotFound(_)) => {
                self.form.inputs.tax_rule_sets.clear();
                self.form.inputs.tax_overrides.clear();
                Self::degraded(FetchKind::TaxRules, "No taxes configured".to_string())
            }
            Err(err) => Self::failed(FetchKind::TaxRules, &err),
        }
    }

    pub fn apply_customer_profile(
        &mut self,
        ticket: &FetchTicket,
        response: Result<Option<CustomerProfile>>,
    ) -> FetchOutcome {
        if !self.accepts(ticket) {
            return FetchOutcome::Discarded;
        }
        match response {
            Ok(Some(profile)) => {
                self.customer_profile = Some(profile);
                FetchOutcome::Applied
            }
            Ok(None) | Err(AppError::NotFound(_)) => {
                self.customer_profile = None;
                Self::degraded(
                    FetchKind::CustomerProfile,
                    format!("No customer profile; treating customer as {}", self.default_customer_type),
                )
            }
            Err(err) => Self::failed(FetchKind::CustomerProfile, &err),
        }
    }

    // Line computation

    fn draft(&self) -> Result<LineDraft> {
        Ok(LineDraft {
            finished_good: self
                .form
                .finished_good
                .clone()
                .ok_or_else(|| AppError::missing_field("Finished good"))?,
            account_level4: self
                .form
                .account_level4
                .clone()
                .ok_or_else(|| AppError::missing_field("Item"))?,
            unit_measurement: self.form.unit_measurement.clone(),
            quantity: self
                .form
                .quantity
                .ok_or_else(|| AppError::missing_field("Quantity"))?,
            rate: self.form.rate.ok_or_else(|| AppError::missing_field("Rate"))?,
            rate_info: self.form.rate_info.clone(),
        })
    }

    /// Live figures for the line in the form
    pub fn preview(&self) -> Result<LineItem> {
        let customer = CustomerProfile::new(self.customer_type());
        LineCalculator::new().compute_line(
            &self.draft()?,
            &self.form.inputs.discounts,
            &self.form.inputs.tax_inputs(self.invoice_date),
            Some(&customer),
        )
    }

    fn validate_for_commit(&self) -> Result<()> {
        if self.godown.is_none() {
            return Err(AppError::missing_field("Godown"));
        }
        if self.debtor_account.is_none() {
            return Err(AppError::missing_field("Debtor account"));
        }
        if self.sub_account.is_none() {
            return Err(AppError::missing_field("Sub account"));
        }
        match self.form.quantity {
            None => return Err(AppError::missing_field("Quantity")),
            Some(quantity) if quantity <= Decimal::ZERO => {
                return Err(AppError::validation("Quantity must be greater than 0"))
            }
            _ => {}
        }
        match self.form.rate {
            None => return Err(AppError::missing_field("Rate")),
            Some(rate) if rate <= Decimal::ZERO => {
                return Err(AppError::validation("Rate must be greater than 0"))
            }
            _ => {}
        }
        Ok(())
    }

    /// Validates the form and computes the line that `add_item` /
    /// `update_item` would commit, without changing the session
    pub fn prepare_commit(&self) -> Result<LineItem> {
        self.ensure_unlocked()?;
        self.validate_for_commit()?;
        let mut item = self.preview()?;
        if let SessionState::Editing(index) = self.state {
            item.id = self.lines[index].item.id.clone();
            item.is_edited = true;
        }
        Ok(item)
    }

    /// Stores a line produced by [`prepare_commit`](Self::prepare_commit):
    /// appended when composing, written over line `i` in place when editing.
    /// Resets the form and returns the line's index.
    pub fn commit_prepared(&mut self, item: LineItem) -> Result<usize> {
        self.ensure_unlocked()?;
        let line = SessionLine {
            item,
            inputs: self.form.inputs.clone(),
        };
        let index = match self.state {
            SessionState::Editing(index) => {
                self.lines[index] = line;
                index
            }
            _ => {
                self.lines.push(line);
                self.lines.len() - 1
            }
        };
        self.form = LineForm::default();
        self.state = SessionState::Composing;
        Ok(index)
    }

    // Transitions

    /// Idle/Composing → Composing, appending the composed line
    pub fn add_item(&mut self) -> Result<&LineItem> {
        self.ensure_unlocked()?;
        if let SessionState::Editing(index) = self.state {
            return Err(AppError::validation(format!(
                "Line {} is being edited; update it first",
                index + 1
            )));
        }
        let item = self.prepare_commit()?;
        let index = self.commit_prepared(item)?;
        tracing::debug!(line = index + 1, "Line added");
        Ok(&self.lines[index].item)
    }

    /// Idle/Composing → Editing(i), loading line i back into the form
    pub fn edit_item(&mut self, index: usize) -> Result<&LineItem> {
        self.ensure_unlocked()?;
        if let SessionState::Editing(current) = self.state {
            return Err(AppError::validation(format!(
                "Line {} is already being edited",
                current + 1
            )));
        }
        let line = self
            .lines
            .get_mut(index)
            .ok_or_else(|| AppError::validation(format!("Line {} does not exist", index + 1)))?;
        line.item.is_being_edited = true;
        self.form = LineForm::load(&line.item, &line.inputs);
        self.state = SessionState::Editing(index);
        Ok(&self.lines[index].item)
    }

    /// Editing(i) → Composing, overwriting line i in place
    pub fn update_item(&mut self) -> Result<&LineItem> {
        self.ensure_unlocked()?;
        if !matches!(self.state, SessionState::Editing(_)) {
            return Err(AppError::validation("No line is being edited"));
        }
        let item = self.prepare_commit()?;
        let index = self.commit_prepared(item)?;
        tracing::debug!(line = index + 1, "Line updated");
        Ok(&self.lines[index].item)
    }

    /// Editing(i) → Composing without changing line i
    pub fn cancel_edit(&mut self) -> Result<()> {
        self.ensure_unlocked()?;
        if let SessionState::Editing(index) = self.state {
            self.lines[index].item.is_being_edited = false;
            self.form = LineForm::default();
            self.state = SessionState::Composing;
        }
        Ok(())
    }

    /// Removes line `index`. Deleting the last line leaves the session Idle
    /// and reports that the voucher itself is gone.
    pub fn delete_item(&mut self, index: usize) -> Result<DeletedLine> {
        self.ensure_unlocked()?;
        if index >= self.lines.len() {
            return Err(AppError::validation(format!("Line {} does not exist", index + 1)));
        }

        let mut removed = self.lines.remove(index).item;
        removed.is_being_edited = false;

        self.state = match self.state {
            SessionState::Editing(current) if current == index => {
                self.form = LineForm::default();
                SessionState::Composing
            }
            SessionState::Editing(current) if current > index => SessionState::Editing(current - 1),
            SessionState::Idle => SessionState::Composing,
            other => other,
        };

        let voucher_emptied = self.lines.is_empty();
        if voucher_emptied {
            self.voucher_id = None;
            if self.form.is_empty() {
                self.state = SessionState::Idle;
            }
        }

        Ok(DeletedLine {
            item: removed,
            voucher_emptied,
        })
    }

    /// Checks that `post` would succeed
    pub fn ensure_postable(&self) -> Result<()> {
        self.ensure_unlocked()?;
        if self.lines.is_empty() {
            return Err(AppError::validation(
                "Voucher must have at least one line item",
            ));
        }
        Ok(())
    }

    /// Any state → PostedLocked. Irreversible.
    pub fn post(&mut self) -> Result<()> {
        self.ensure_postable()?;
        if let SessionState::Editing(index) = self.state {
            self.lines[index].item.is_being_edited = false;
        }
        self.form = LineForm::default();
        self.state = SessionState::PostedLocked;
        self.fetches.invalidate_all();
        tracing::info!(
            voucher_id = self.voucher_id.as_deref().unwrap_or("-"),
            lines = self.lines.len(),
            "Voucher posted"
        );
        Ok(())
    }

    pub fn ensure_unlocked(&self) -> Result<()> {
        if self.is_posted() {
            return Err(AppError::locked("no further changes are accepted"));
        }
        Ok(())
    }

    fn touch(&mut self) {
        if self.state == SessionState::Idle {
            self.state = SessionState::Composing;
        }
    }
}
