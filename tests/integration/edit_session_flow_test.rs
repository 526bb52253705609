// Voucher edit session: add / edit / update / delete / post transitions,
// commit validation, overrides and lookup degradation.

#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use sales_voucher::core::AppError;
use sales_voucher::modules::pricing::models::CustomerProfile;
use sales_voucher::modules::vouchers::services::{
    FetchKind, FetchOutcome, SessionState, VoucherEditSession,
};

fn priced_session() -> VoucherEditSession {
    let mut session = header_session();
    compose_line(&mut session, dec!(10), dec!(5));

    let ticket = session.begin_fetch(FetchKind::CustomerProfile).unwrap();
    session.apply_customer_profile(&ticket, Ok(Some(CustomerProfile::registered())));
    let ticket = session.begin_fetch(FetchKind::DiscountRules).unwrap();
    session.apply_discount_rules(&ticket, Ok(vec![trade_discount(dec!(10), true)]));
    let ticket = session.begin_fetch(FetchKind::TaxRules).unwrap();
    session.apply_tax_rules(&ticket, Ok(vec![gst(dec!(5), dec!(0))]));
    session
}

#[test]
fn test_add_item_prices_and_appends() {
    let mut session = priced_session();

    let preview = session.preview().unwrap();
    assert_eq!(preview.net_amount, dec!(47.25));

    let item = session.add_item().unwrap().clone();
    assert_eq!(item.amount, dec!(50));
    assert_eq!(item.net_amount_before_tax, dec!(45));
    assert_eq!(item.net_amount, dec!(47.25));
    assert_eq!(session.state(), SessionState::Composing);
    assert_eq!(session.line_count(), 1);
    assert!(session.form().finished_good.is_none());
}

#[test]
fn test_commit_validation_reports_first_missing_field() {
    let mut session = VoucherEditSession::new(scope(), invoice_date());
    compose_line(&mut session, dec!(1), dec!(1));
    let err = session.add_item().unwrap_err();
    assert_eq!(err.to_string(), "Validation error: Godown is required");

    session.select_godown(Some(godown())).unwrap();
    let err = session.add_item().unwrap_err();
    assert_eq!(err.to_string(), "Validation error: Debtor account is required");

    session.select_debtor_account(Some(debtor())).unwrap();
    let err = session.add_item().unwrap_err();
    assert_eq!(err.to_string(), "Validation error: Sub account is required");

    session.select_sub_account(Some(sub_account())).unwrap();
    session.set_quantity(Decimal::ZERO).unwrap();
    let err = session.add_item().unwrap_err();
    assert_eq!(err.to_string(), "Validation error: Quantity must be greater than 0");

    session.set_quantity(dec!(2)).unwrap();
    session.set_rate(Decimal::ZERO).unwrap();
    let err = session.add_item().unwrap_err();
    assert_eq!(err.to_string(), "Validation error: Rate must be greater than 0");

    assert_eq!(session.line_count(), 0);
}

#[test]
fn test_edit_then_update_overwrites_in_place() {
    let mut session = priced_session();
    session.add_item().unwrap();
    compose_line(&mut session, dec!(2), dec!(100));
    session.add_item().unwrap();

    let loaded = session.edit_item(0).unwrap().clone();
    assert!(loaded.is_being_edited);
    assert_eq!(session.state(), SessionState::Editing(0));
    assert_eq!(session.form().quantity, Some(dec!(10)));
    assert_eq!(session.form().inputs.discounts.rule_sets.len(), 1);

    session.set_quantity(dec!(20)).unwrap();
    let updated = session.update_item().unwrap().clone();

    assert_eq!(session.line_count(), 2);
    assert_eq!(session.state(), SessionState::Composing);
    assert_eq!(updated.amount, dec!(100));
    assert!(updated.is_edited);
    assert!(!updated.is_being_edited);
    assert_eq!(session.item(0).unwrap().amount, dec!(100));
    assert_eq!(session.item(1).unwrap().amount, dec!(200));
}

#[test]
fn test_add_rejected_while_editing() {
    let mut session = priced_session();
    session.add_item().unwrap();
    session.edit_item(0).unwrap();

    let err = session.add_item().unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(session.line_count(), 1);
}

#[test]
fn test_cancel_edit_keeps_line() {
    let mut session = priced_session();
    session.add_item().unwrap();
    session.edit_item(0).unwrap();
    session.set_quantity(dec!(99)).unwrap();

    session.cancel_edit().unwrap();

    assert_eq!(session.state(), SessionState::Composing);
    assert_eq!(session.item(0).unwrap().quantity, dec!(10));
    assert!(!session.item(0).unwrap().is_being_edited);
}

#[test]
fn test_delete_shifts_editing_index() {
    let mut session = priced_session();
    session.add_item().unwrap();
    compose_line(&mut session, dec!(1), dec!(1));
    session.add_item().unwrap();
    compose_line(&mut session, dec!(2), dec!(2));
    session.add_item().unwrap();

    session.edit_item(2).unwrap();
    let deleted = session.delete_item(0).unwrap();

    assert!(!deleted.voucher_emptied);
    assert_eq!(session.state(), SessionState::Editing(1));
    assert_eq!(session.item(1).unwrap().quantity, dec!(2));
}

#[test]
fn test_deleting_edited_line_returns_to_composing() {
    let mut session = priced_session();
    session.add_item().unwrap();
    compose_line(&mut session, dec!(1), dec!(1));
    session.add_item().unwrap();

    session.edit_item(1).unwrap();
    session.delete_item(1).unwrap();

    assert_eq!(session.state(), SessionState::Composing);
    assert_eq!(session.line_count(), 1);
    assert!(session.form().quantity.is_none());
}

#[test]
fn test_deleting_last_line_empties_voucher() {
    let mut session = priced_session();
    session.add_item().unwrap();
    session.edit_item(0).unwrap();

    let deleted = session.delete_item(0).unwrap();

    assert!(deleted.voucher_emptied);
    assert_eq!(session.line_count(), 0);
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
fn test_post_requires_a_line() {
    let mut session = header_session();
    let err = session.post().unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(!session.is_posted());
}

#[test]
fn test_posted_voucher_rejects_every_mutation() {
    let mut session = priced_session();
    session.add_item().unwrap();
    session.edit_item(0).unwrap();
    session.post().unwrap();

    assert_eq!(session.state(), SessionState::PostedLocked);
    assert!(!session.item(0).unwrap().is_being_edited);
    let before = session.line_items();

    assert!(matches!(session.add_item(), Err(AppError::Locked(_))));
    assert!(matches!(session.update_item(), Err(AppError::Locked(_))));
    assert!(matches!(session.edit_item(0), Err(AppError::Locked(_))));
    assert!(matches!(session.delete_item(0), Err(AppError::Locked(_))));
    assert!(matches!(session.set_quantity(dec!(1)), Err(AppError::Locked(_))));
    assert!(matches!(session.select_godown(None), Err(AppError::Locked(_))));
    assert!(matches!(session.post(), Err(AppError::Locked(_))));
    assert!(session.begin_fetch(FetchKind::Rate).is_none());

    assert_eq!(session.line_items(), before);
}

#[test]
fn test_discount_value_edit_and_reset() {
    let mut session = priced_session();

    session.edit_discount_value("trade", dec!(10)).unwrap();
    let edited = session.preview().unwrap();
    assert_eq!(edited.discount_breakdown[0].rate, dec!(20));
    assert_eq!(edited.net_amount_before_tax, dec!(40));
    assert!(edited.is_edited);

    session.reset_discount("trade").unwrap();
    let reset = session.preview().unwrap();
    assert_eq!(reset.discount_breakdown[0].rate, dec!(10));
    assert_eq!(reset.discount_breakdown[0].value, dec!(5));
    assert!(!reset.discount_breakdown[0].is_edited);
}

#[test]
fn test_discount_rate_edit_replaces_value_edit() {
    let mut session = priced_session();
    session.edit_discount_value("trade", dec!(10)).unwrap();
    session.edit_discount_rate("trade", dec!(4)).unwrap();

    let line = session.preview().unwrap();
    assert_eq!(line.discount_breakdown[0].value, dec!(2));
}

#[test]
fn test_unknown_discount_cannot_be_edited() {
    let mut session = priced_session();
    let err = session.edit_discount_rate("loyalty", dec!(1)).unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[test]
fn test_negative_override_rejected() {
    let mut session = priced_session();
    assert!(session.edit_discount_value("trade", dec!(-1)).is_err());
    assert!(session.edit_tax_rate("gst", dec!(-1)).is_err());
}

#[test]
fn test_tax_rate_edit_follows_customer_column() {
    let mut session = priced_session();
    session.edit_tax_rate("gst", dec!(8)).unwrap();
    assert_eq!(session.preview().unwrap().tax_breakdown[0].value, dec!(3.6));

    // Switching the customer to un-registered does not reuse the edit
    let ticket = session.begin_fetch(FetchKind::CustomerProfile).unwrap();
    session.apply_customer_profile(&ticket, Ok(Some(CustomerProfile::unregistered())));
    let line = session.preview().unwrap();
    assert!(line.tax_breakdown.is_empty());
    assert_eq!(line.net_amount, dec!(45));
}

#[test]
fn test_tax_value_edit_and_reset() {
    let mut session = priced_session();
    session.edit_tax_value("gst", dec!(4.5)).unwrap();

    let edited = session.preview().unwrap();
    assert_eq!(edited.tax_breakdown[0].current_rate, dec!(10));
    assert_eq!(edited.net_amount, dec!(49.5));

    session.reset_tax("gst").unwrap();
    assert_eq!(session.preview().unwrap().net_amount, dec!(47.25));
}

#[test]
fn test_changing_debtor_clears_dependents() {
    let mut session = priced_session();
    session
        .select_debtor_account(Some(sales_voucher::core::SelectableOption::new("d-9", "Other Debtors")))
        .unwrap();

    assert!(session.sub_account().is_none());
    assert!(session.customer_profile().is_none());
    assert!(session.form().inputs.discounts.rule_sets.is_empty());
    // Product selections survive
    assert!(session.form().finished_good.is_some());
}

#[test]
fn test_missing_rate_degrades_to_zero() {
    let mut session = header_session();
    session.select_finished_good(Some(finished_good())).unwrap();
    session.select_account_level4(Some(item())).unwrap();
    session.set_quantity(dec!(3)).unwrap();

    let ticket = session.begin_fetch(FetchKind::Rate).unwrap();
    let outcome = session.apply_rate(&ticket, Ok(None));

    assert!(matches!(outcome, FetchOutcome::Degraded { .. }));
    assert_eq!(outcome.warning().unwrap().kind, FetchKind::Rate);
    assert_eq!(session.form().rate, Some(Decimal::ZERO));

    let err = session.add_item().unwrap_err();
    assert_eq!(err.to_string(), "Validation error: Rate must be greater than 0");
}

#[test]
fn test_failed_lookup_keeps_previous_values() {
    let mut session = priced_session();

    let ticket = session.begin_fetch(FetchKind::DiscountRules).unwrap();
    let outcome = session.apply_discount_rules(&ticket, Err(AppError::internal("connection reset")));

    assert!(matches!(outcome, FetchOutcome::Failed { .. }));
    assert_eq!(session.form().inputs.discounts.rule_sets.len(), 1);
    assert_eq!(session.preview().unwrap().net_amount_before_tax, dec!(45));
}

#[test]
fn test_missing_customer_profile_uses_default_type() {
    let mut session = priced_session();
    let ticket = session.begin_fetch(FetchKind::CustomerProfile).unwrap();
    let outcome = session.apply_customer_profile(&ticket, Err(AppError::not_found("customer")));

    assert!(outcome.warning().is_some());
    assert!(session.preview().unwrap().tax_breakdown.is_empty());
}

#[test]
fn test_ledger_of_session_balances() {
    let mut session = priced_session();
    session.add_item().unwrap();
    compose_line(&mut session, dec!(2), dec!(100));
    session.add_item().unwrap();

    let ledger = session.ledger(&Default::default());
    assert!(ledger.is_balanced);
    assert_eq!(ledger.debit_rows[0].title, "Ali Traders");
    assert_eq!(session.totals().net_amount, dec!(247.25));
}
