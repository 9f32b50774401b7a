use crate::dialog::menu::{is_start_command, MenuAction, CUSTOM_QUANTITY_LABEL, DETAILS_LABEL};
use crate::dialog::reply::{self, Reply};
use crate::dialog::session::{DialogSession, Draft};
use crate::dialog::states::{
    ActionOutcome, DialogAction, DialogInput, DialogState, InputClass, Settled, Transition,
};
use crate::domain::item::{parse_number, quantity_from, ItemId};
use crate::errors::ValidationError;

pub fn classify(input: &DialogInput) -> InputClass {
    let text = match input {
        DialogInput::Photo(photo) => return InputClass::Photo(photo.clone()),
        DialogInput::Text(text) => text.trim(),
    };

    if is_start_command(text) {
        return InputClass::Start;
    }
    match MenuAction::parse(text) {
        Some(MenuAction::Back) => return InputClass::Back,
        Some(action) => return InputClass::Menu(action),
        None => {}
    }
    if text == DETAILS_LABEL {
        return InputClass::Details;
    }
    if text == CUSTOM_QUANTITY_LABEL {
        return InputClass::Custom;
    }
    match parse_number(text) {
        Some(value) => InputClass::Number(value),
        None => InputClass::Text,
    }
}

/// Maps `(state, input class)` to the next state, the effect to run and the reply.
pub fn transition(session: &DialogSession, input: &DialogInput) -> Transition {
    use DialogState::{
        ChoosingIssueQuantity, Idle, ListingShown, TypingChangeId, TypingDeleteId, TypingDetailId,
        TypingIssueId, TypingName, TypingNewQuantity, TypingPhoto, TypingQuantity,
    };
    use InputClass::{Back, Custom, Details, Menu, Number, Photo, Start};

    let from = session.state;
    let text = input.as_text().map(str::trim).unwrap_or_default();

    match (from, classify(input)) {
        (_, Start) => reset(from, reply::main_menu()),
        (Idle, Menu(action)) => enter(action),
        (Idle, _) => ignore(session),
        (_, Back) => reset(from, reply::cancelled()),

        (TypingName | TypingQuantity, Photo(_)) => stay(session, reply::text_expected()),
        (TypingName, _) => advance(
            from,
            TypingQuantity,
            Draft { name: Some(text.to_owned()), ..session.draft.clone() },
            reply::prompt_quantity(),
        ),
        (TypingQuantity, _) => advance(
            from,
            TypingPhoto,
            Draft { quantity: Some(text.to_owned()), ..session.draft.clone() },
            reply::prompt_photo(),
        ),

        (TypingPhoto, Photo(photo)) => perform(
            from,
            Idle,
            Draft::default(),
            DialogAction::CreateItem {
                name: session.draft.name.clone().unwrap_or_default(),
                quantity: session.draft.quantity.clone().unwrap_or_default(),
                photo,
            },
        ),
        (TypingPhoto, _) => stay(session, reply::photo_expected()),

        (TypingDeleteId, Number(id)) => {
            perform(from, Idle, Draft::default(), DialogAction::DeleteItem(ItemId(id)))
        }
        (TypingDetailId, Number(id)) => {
            perform(from, Idle, Draft::default(), DialogAction::ShowItem(ItemId(id)))
        }
        (TypingChangeId, Number(id)) => perform(
            from,
            TypingNewQuantity,
            Draft { item_id: Some(ItemId(id)), ..Draft::default() },
            DialogAction::PrepareChange(ItemId(id)),
        ),
        (TypingIssueId, Number(id)) => perform(
            from,
            ChoosingIssueQuantity,
            Draft { item_id: Some(ItemId(id)), ..Draft::default() },
            DialogAction::PrepareIssue(ItemId(id)),
        ),
        (TypingDeleteId | TypingChangeId | TypingDetailId | TypingIssueId, _) => {
            stay(session, reply::number_expected())
        }

        (TypingNewQuantity, Number(value)) if session.draft.issuing => issue(session, value),
        (TypingNewQuantity, Number(value)) => set_quantity(session, value),
        (TypingNewQuantity, _) => stay(session, reply::number_expected()),

        (ChoosingIssueQuantity, Custom) => advance(
            from,
            TypingNewQuantity,
            Draft { issuing: true, ..session.draft.clone() },
            reply::prompt_custom_issue_quantity(),
        ),
        (ChoosingIssueQuantity, Number(value)) => issue(session, value),
        (ChoosingIssueQuantity, _) => stay(session, reply::issue_choices()),

        (ListingShown, Details) => {
            advance(from, TypingDetailId, Draft::default(), reply::prompt_detail_id())
        }
        (ListingShown, _) => stay(session, reply::listing_choices()),
    }
}

/// Folds the outcome of a transition's action into the final session state and reply.
/// Any failure ends the dialog: the operator lands back on the main menu.
pub fn settle(transition: &Transition, outcome: ActionOutcome) -> Settled {
    let reply = match outcome {
        ActionOutcome::Failed(error) => {
            return Settled {
                state: DialogState::Idle,
                draft: Draft::default(),
                reply: Some(reply::failure(&error)),
            };
        }
        ActionOutcome::Listed(items) => reply::item_list(&items),
        ActionOutcome::Created(item) => reply::item_created(&item),
        ActionOutcome::Deleted(id) => reply::item_deleted(id),
        ActionOutcome::Found(item) => match transition.action {
            Some(DialogAction::PrepareChange(_)) => reply::prompt_new_quantity(&item),
            Some(DialogAction::PrepareIssue(_)) => reply::prompt_issue_quantity(&item),
            _ => reply::item_card(&item),
        },
        ActionOutcome::QuantitySet { item_id, quantity } => {
            reply::quantity_updated(item_id, quantity)
        }
        ActionOutcome::Issued { item, requested, remaining } => {
            reply::issued(&item, requested, remaining)
        }
    };

    Settled { state: transition.to, draft: transition.draft.clone(), reply: Some(reply) }
}

fn enter(action: MenuAction) -> Transition {
    let (to, reply) = match action {
        MenuAction::Add => (DialogState::TypingName, reply::prompt_name()),
        MenuAction::Remove => (DialogState::TypingDeleteId, reply::prompt_delete_id()),
        MenuAction::ChangeQuantity => (DialogState::TypingChangeId, reply::prompt_change_id()),
        MenuAction::Issue => (DialogState::TypingIssueId, reply::prompt_issue_id()),
        MenuAction::List => {
            return perform(
                DialogState::Idle,
                DialogState::ListingShown,
                Draft::default(),
                DialogAction::ListItems,
            );
        }
        MenuAction::Back => return ignore(&DialogSession::default()),
    };
    advance(DialogState::Idle, to, Draft::default(), reply)
}

fn set_quantity(session: &DialogSession, value: i64) -> Transition {
    let Some(item_id) = session.draft.item_id else {
        return reset(session.state, reply::session_expired());
    };
    match quantity_from(value) {
        Ok(quantity) => perform(
            session.state,
            DialogState::Idle,
            Draft::default(),
            DialogAction::SetQuantity { item_id, quantity },
        ),
        Err(error) => stay(session, reply::validation_failed(error)),
    }
}

fn issue(session: &DialogSession, value: i64) -> Transition {
    let Some(item_id) = session.draft.item_id else {
        return reset(session.state, reply::session_expired());
    };
    match quantity_from(value) {
        Ok(0) => stay(session, reply::validation_failed(ValidationError::ZeroIssue)),
        Ok(requested) => perform(
            session.state,
            DialogState::Idle,
            Draft::default(),
            DialogAction::IssueStock { item_id, requested },
        ),
        Err(error) => stay(session, reply::validation_failed(error)),
    }
}

fn advance(from: DialogState, to: DialogState, draft: Draft, reply: Reply) -> Transition {
    Transition { from, to, draft, action: None, reply: Some(reply) }
}

fn perform(from: DialogState, to: DialogState, draft: Draft, action: DialogAction) -> Transition {
    Transition { from, to, draft, action: Some(action), reply: None }
}

fn stay(session: &DialogSession, reply: Reply) -> Transition {
    Transition {
        from: session.state,
        to: session.state,
        draft: session.draft.clone(),
        action: None,
        reply: Some(reply),
    }
}

fn ignore(session: &DialogSession) -> Transition {
    Transition {
        from: session.state,
        to: session.state,
        draft: session.draft.clone(),
        action: None,
        reply: None,
    }
}

fn reset(from: DialogState, reply: Reply) -> Transition {
    Transition {
        from,
        to: DialogState::Idle,
        draft: Draft::default(),
        action: None,
        reply: Some(reply),
    }
}

#[cfg(test)]
mod tests {
    use super::{classify, settle, transition};
    use crate::dialog::menu::{MenuAction, CUSTOM_QUANTITY_LABEL, DETAILS_LABEL};
    use crate::dialog::reply;
    use crate::dialog::session::{DialogSession, Draft};
    use crate::dialog::states::{
        ActionOutcome, DialogAction, DialogInput, DialogState, InputClass, PhotoAttachment,
    };
    use crate::domain::item::{Item, ItemId};
    use crate::errors::{DialogError, ValidationError};

    const TYPING_STATES: [DialogState; 8] = [
        DialogState::TypingName,
        DialogState::TypingQuantity,
        DialogState::TypingPhoto,
        DialogState::TypingDeleteId,
        DialogState::TypingChangeId,
        DialogState::TypingNewQuantity,
        DialogState::TypingDetailId,
        DialogState::TypingIssueId,
    ];

    fn text(value: &str) -> DialogInput {
        DialogInput::Text(value.to_owned())
    }

    fn photo() -> DialogInput {
        DialogInput::Photo(PhotoAttachment { file_id: "file-1".to_owned() })
    }

    fn at(state: DialogState, draft: Draft) -> DialogSession {
        DialogSession::new(state, draft)
    }

    fn with_item(id: i64) -> Draft {
        Draft { item_id: Some(ItemId(id)), ..Draft::default() }
    }

    fn widget(quantity: u32) -> Item {
        Item { id: ItemId(3), name: "Widget".to_owned(), quantity, photo_ref: "p.jpg".to_owned() }
    }

    #[test]
    fn classify_recognises_menu_sentinels_and_numbers() {
        assert_eq!(classify(&text("/start")), InputClass::Start);
        assert_eq!(classify(&text("Назад")), InputClass::Back);
        assert_eq!(classify(&text("Удалить предмет")), InputClass::Menu(MenuAction::Remove));
        assert_eq!(classify(&text(DETAILS_LABEL)), InputClass::Details);
        assert_eq!(classify(&text(CUSTOM_QUANTITY_LABEL)), InputClass::Custom);
        assert_eq!(classify(&text(" -4 ")), InputClass::Number(-4));
        assert_eq!(classify(&text("hello")), InputClass::Text);
        assert!(matches!(classify(&photo()), InputClass::Photo(_)));
    }

    #[test]
    fn back_in_idle_is_a_silent_no_op() {
        let outcome = transition(&DialogSession::default(), &text("Назад"));

        assert_eq!(outcome.to, DialogState::Idle);
        assert_eq!(outcome.action, None);
        assert_eq!(outcome.reply, None);
    }

    #[test]
    fn unrecognised_text_in_idle_is_ignored() {
        let outcome = transition(&DialogSession::default(), &text("привет"));
        assert_eq!(outcome.to, DialogState::Idle);
        assert!(outcome.reply.is_none());
    }

    #[test]
    fn back_from_every_typing_state_returns_to_idle_and_drops_draft() {
        let draft = Draft {
            name: Some("Widget".to_owned()),
            quantity: Some("10".to_owned()),
            item_id: Some(ItemId(4)),
            issuing: true,
        };

        for state in TYPING_STATES.into_iter().chain([
            DialogState::ListingShown,
            DialogState::ChoosingIssueQuantity,
        ]) {
            let outcome = transition(&at(state, draft.clone()), &text("Назад"));
            assert_eq!(outcome.to, DialogState::Idle, "back from {state:?}");
            assert_eq!(outcome.draft, Draft::default(), "draft kept after back from {state:?}");
            assert_eq!(outcome.action, None);
            assert!(outcome.reply.is_some());
        }
    }

    #[test]
    fn start_resets_any_state_and_shows_menu() {
        let outcome = transition(&at(DialogState::TypingPhoto, with_item(1)), &text("/start"));

        assert_eq!(outcome.to, DialogState::Idle);
        assert_eq!(outcome.draft, Draft::default());
        let reply = outcome.reply.expect("menu reply");
        assert_eq!(reply.suggestions.len(), MenuAction::MAIN.len());
    }

    #[test]
    fn menu_entry_points_clear_the_draft() {
        let cases = [
            ("Добавить предмет", DialogState::TypingName),
            ("Удалить предмет", DialogState::TypingDeleteId),
            ("Изменить количество", DialogState::TypingChangeId),
            ("Выдать товар", DialogState::TypingIssueId),
        ];
        for (label, expected) in cases {
            let outcome = transition(&DialogSession::default(), &text(label));
            assert_eq!(outcome.to, expected, "entry for {label}");
            assert_eq!(outcome.draft, Draft::default());
            assert!(outcome.action.is_none());
            assert!(outcome.reply.is_some());
        }
    }

    #[test]
    fn list_menu_fetches_items_before_showing_listing() {
        let outcome = transition(&DialogSession::default(), &text("Показать все предметы"));

        assert_eq!(outcome.to, DialogState::ListingShown);
        assert_eq!(outcome.action, Some(DialogAction::ListItems));
        assert!(outcome.reply.is_none());
    }

    #[test]
    fn add_flow_collects_name_then_raw_quantity_then_photo() {
        let name = transition(&at(DialogState::TypingName, Draft::default()), &text(" Widget "));
        assert_eq!(name.to, DialogState::TypingQuantity);
        assert_eq!(name.draft.name.as_deref(), Some("Widget"));

        let quantity = transition(&at(name.to, name.draft.clone()), &text("десять"));
        assert_eq!(quantity.to, DialogState::TypingPhoto);
        assert_eq!(quantity.draft.quantity.as_deref(), Some("десять"));

        let create = transition(&at(quantity.to, quantity.draft.clone()), &photo());
        assert_eq!(create.to, DialogState::Idle);
        assert_eq!(create.draft, Draft::default());
        assert_eq!(
            create.action,
            Some(DialogAction::CreateItem {
                name: "Widget".to_owned(),
                quantity: "десять".to_owned(),
                photo: PhotoAttachment { file_id: "file-1".to_owned() },
            })
        );
    }

    #[test]
    fn numeric_or_menu_text_is_a_valid_item_name() {
        let outcome = transition(&at(DialogState::TypingName, Draft::default()), &text("42"));
        assert_eq!(outcome.draft.name.as_deref(), Some("42"));

        let outcome =
            transition(&at(DialogState::TypingName, Draft::default()), &text("Выдать товар"));
        assert_eq!(outcome.draft.name.as_deref(), Some("Выдать товар"));
    }

    #[test]
    fn photo_wait_reprompts_on_text() {
        let draft = Draft { name: Some("Widget".to_owned()), ..Draft::default() };
        let outcome = transition(&at(DialogState::TypingPhoto, draft.clone()), &text("later"));

        assert_eq!(outcome.to, DialogState::TypingPhoto);
        assert_eq!(outcome.draft, draft);
        assert!(outcome.action.is_none());
    }

    #[test]
    fn photo_in_text_state_reprompts() {
        let outcome = transition(&at(DialogState::TypingName, Draft::default()), &photo());
        assert_eq!(outcome.to, DialogState::TypingName);
        assert!(outcome.action.is_none());
    }

    #[test]
    fn id_states_loop_on_unparseable_text() {
        for state in [
            DialogState::TypingDeleteId,
            DialogState::TypingChangeId,
            DialogState::TypingDetailId,
            DialogState::TypingIssueId,
        ] {
            let outcome = transition(&at(state, Draft::default()), &text("abc"));
            assert_eq!(outcome.to, state);
            assert!(outcome.action.is_none());
            assert_eq!(
                outcome.reply.map(|reply| reply.text),
                Some(ValidationError::NotANumber.user_message().to_owned())
            );
        }
    }

    #[test]
    fn delete_runs_immediately_and_returns_to_idle() {
        let outcome = transition(&at(DialogState::TypingDeleteId, Draft::default()), &text("7"));
        assert_eq!(outcome.to, DialogState::Idle);
        assert_eq!(outcome.action, Some(DialogAction::DeleteItem(ItemId(7))));
    }

    #[test]
    fn change_and_issue_remember_item_id() {
        let change = transition(&at(DialogState::TypingChangeId, Draft::default()), &text("3"));
        assert_eq!(change.to, DialogState::TypingNewQuantity);
        assert_eq!(change.draft.item_id, Some(ItemId(3)));
        assert_eq!(change.action, Some(DialogAction::PrepareChange(ItemId(3))));

        let issue = transition(&at(DialogState::TypingIssueId, Draft::default()), &text("3"));
        assert_eq!(issue.to, DialogState::ChoosingIssueQuantity);
        assert_eq!(issue.draft.item_id, Some(ItemId(3)));
        assert_eq!(issue.action, Some(DialogAction::PrepareIssue(ItemId(3))));
    }

    #[test]
    fn new_quantity_rejects_negative_values_without_mutation() {
        let session = at(DialogState::TypingNewQuantity, with_item(3));
        let outcome = transition(&session, &text("-2"));

        assert_eq!(outcome.to, DialogState::TypingNewQuantity);
        assert_eq!(outcome.draft, session.draft);
        assert!(outcome.action.is_none());
    }

    #[test]
    fn new_quantity_reports_oversized_input_as_too_large() {
        let session = at(DialogState::TypingNewQuantity, with_item(3));
        let outcome = transition(&session, &text("99999999999999999999"));

        assert_eq!(outcome.to, DialogState::TypingNewQuantity);
        assert!(outcome.action.is_none());
        assert_eq!(outcome.reply, Some(reply::validation_failed(ValidationError::TooLarge)));
    }

    #[test]
    fn new_quantity_sets_stock_level() {
        let outcome = transition(&at(DialogState::TypingNewQuantity, with_item(3)), &text("12"));

        assert_eq!(outcome.to, DialogState::Idle);
        assert_eq!(
            outcome.action,
            Some(DialogAction::SetQuantity { item_id: ItemId(3), quantity: 12 })
        );
    }

    #[test]
    fn new_quantity_without_item_resets_session() {
        let outcome =
            transition(&at(DialogState::TypingNewQuantity, Draft::default()), &text("12"));
        assert_eq!(outcome.to, DialogState::Idle);
        assert!(outcome.action.is_none());
    }

    #[test]
    fn preset_issue_quantity_requests_stock_check() {
        let outcome =
            transition(&at(DialogState::ChoosingIssueQuantity, with_item(3)), &text("2"));

        assert_eq!(outcome.to, DialogState::Idle);
        assert_eq!(
            outcome.action,
            Some(DialogAction::IssueStock { item_id: ItemId(3), requested: 2 })
        );
    }

    #[test]
    fn custom_issue_quantity_goes_through_typed_entry() {
        let custom = transition(
            &at(DialogState::ChoosingIssueQuantity, with_item(3)),
            &text(CUSTOM_QUANTITY_LABEL),
        );
        assert_eq!(custom.to, DialogState::TypingNewQuantity);
        assert!(custom.draft.issuing);
        assert_eq!(custom.draft.item_id, Some(ItemId(3)));

        let typed = transition(&at(custom.to, custom.draft.clone()), &text("4"));
        assert_eq!(
            typed.action,
            Some(DialogAction::IssueStock { item_id: ItemId(3), requested: 4 })
        );

        let zero = transition(&at(custom.to, custom.draft), &text("0"));
        assert_eq!(zero.to, DialogState::TypingNewQuantity);
        assert!(zero.action.is_none());
    }

    #[test]
    fn issue_choice_loops_on_unparseable_text() {
        let outcome =
            transition(&at(DialogState::ChoosingIssueQuantity, with_item(3)), &text("много"));
        assert_eq!(outcome.to, DialogState::ChoosingIssueQuantity);
        assert!(outcome.action.is_none());
    }

    #[test]
    fn listing_details_asks_for_id() {
        let details =
            transition(&at(DialogState::ListingShown, Draft::default()), &text(DETAILS_LABEL));
        assert_eq!(details.to, DialogState::TypingDetailId);

        let other = transition(&at(DialogState::ListingShown, Draft::default()), &text("5"));
        assert_eq!(other.to, DialogState::ListingShown);
    }

    #[test]
    fn detail_id_shows_item_and_returns_to_idle() {
        let outcome = transition(&at(DialogState::TypingDetailId, Draft::default()), &text("9"));
        assert_eq!(outcome.to, DialogState::Idle);
        assert_eq!(outcome.action, Some(DialogAction::ShowItem(ItemId(9))));
    }

    #[test]
    fn settle_failure_aborts_to_idle() {
        let pending = transition(&at(DialogState::TypingIssueId, Draft::default()), &text("3"));
        let settled = settle(&pending, ActionOutcome::Failed(DialogError::NotFound(ItemId(3))));

        assert_eq!(settled.state, DialogState::Idle);
        assert_eq!(settled.draft, Draft::default());
        assert!(settled.reply.expect("failure reply").text.contains("не найден"));
    }

    #[test]
    fn settle_found_item_routes_by_action() {
        let issue = transition(&at(DialogState::TypingIssueId, Draft::default()), &text("3"));
        let settled = settle(&issue, ActionOutcome::Found(widget(5)));
        assert_eq!(settled.state, DialogState::ChoosingIssueQuantity);
        assert_eq!(settled.draft.item_id, Some(ItemId(3)));
        let reply = settled.reply.expect("issue prompt");
        assert!(reply.suggestions.iter().any(|label| label == CUSTOM_QUANTITY_LABEL));
        assert_eq!(reply.image.as_deref(), Some("p.jpg"));

        let change = transition(&at(DialogState::TypingChangeId, Draft::default()), &text("3"));
        let settled = settle(&change, ActionOutcome::Found(widget(5)));
        assert_eq!(settled.state, DialogState::TypingNewQuantity);
        assert!(settled.reply.expect("change prompt").text.contains("сейчас 5"));
    }

    #[test]
    fn settle_insufficient_stock_reports_and_goes_idle() {
        let pending =
            transition(&at(DialogState::ChoosingIssueQuantity, with_item(3)), &text("10"));
        let settled = settle(
            &pending,
            ActionOutcome::Failed(DialogError::InsufficientStock {
                item_id: ItemId(3),
                requested: 10,
                available: 5,
            }),
        );

        assert_eq!(settled.state, DialogState::Idle);
        assert!(settled.reply.expect("stock reply").text.contains("Недостаточно"));
    }

    #[test]
    fn settle_listing_keeps_listing_state() {
        let pending = transition(&DialogSession::default(), &text("Показать все предметы"));
        let settled = settle(&pending, ActionOutcome::Listed(vec![widget(5)]));

        assert_eq!(settled.state, DialogState::ListingShown);
        let reply = settled.reply.expect("listing");
        assert!(reply.suggestions.iter().any(|label| label == DETAILS_LABEL));
    }

    #[test]
    fn transitions_are_deterministic() {
        let inputs = ["Выдать товар", "3", CUSTOM_QUANTITY_LABEL, "x", "2"];
        let run = || {
            let mut session = DialogSession::default();
            let mut trail = Vec::new();
            for input in inputs {
                let step = transition(&session, &text(input));
                session = DialogSession::new(step.to, step.draft.clone());
                trail.push(step);
            }
            trail
        };

        assert_eq!(run(), run());
    }
}
