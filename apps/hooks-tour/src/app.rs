//! Components of the hooks tour. Every component renders a [`Frame`]: a line
//! of text plus the buttons a user could press.

use hookwork_core::{
    create_context, deps, Callback, Component, Context, EffectCleanup, RenderScope,
};
use std::fmt;
use std::rc::Rc;

type Scope<'a> = RenderScope<'a, Frame>;

#[derive(Clone, Debug)]
pub struct Button {
    pub label: String,
    pub on_click: Callback<()>,
}

#[derive(Clone, Debug, Default)]
pub struct Frame {
    pub text: String,
    pub buttons: Vec<Button>,
}

impl Frame {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    pub fn button(mut self, label: impl Into<String>, on_click: Callback<()>) -> Self {
        self.buttons.push(Button {
            label: label.into(),
            on_click,
        });
        self
    }

    pub fn find_button(&self, label: &str) -> Option<&Button> {
        self.buttons.iter().find(|button| button.label == label)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)?;
        for button in &self.buttons {
            write!(f, " [{}]", button.label)?;
        }
        Ok(())
    }
}

/// Counter with a value update (`+1`) and a functional update (`-1`).
pub fn counter() -> Component<(), Frame> {
    Component::new("Counter", |scope: &mut Scope<'_>, _: &()| {
        let (count, set_count) = scope.use_state(|| 0i32)?;
        log::info!("render Counter count={count}");
        scope.use_passive_effect(deps![count], move || {
            log::info!("effect: count is {count}");
            EffectCleanup::new(move || log::info!("cleanup: count was {count}"))
        })?;

        let increment = {
            let set_count = set_count.clone();
            Callback::new(move |()| set_count.set(count + 1))
        };
        let decrement = Callback::new(move |()| set_count.update(|prev| prev - 1));
        Ok(Frame::text(format!("Count: {count}"))
            .button("+1", increment)
            .button("-1", decrement))
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CounterAction {
    Increment,
    Decrement,
    Double,
    Reset,
}

pub fn reduce(state: &i32, action: CounterAction) -> i32 {
    match action {
        CounterAction::Increment => state + 1,
        CounterAction::Decrement => state - 1,
        CounterAction::Double => state * 2,
        CounterAction::Reset => 0,
    }
}

pub fn reducer_counter() -> Component<(), Frame> {
    Component::new("ReducerCounter", |scope: &mut Scope<'_>, _: &()| {
        let (value, dispatch) = scope.use_reducer(reduce, || 0)?;
        log::info!("render ReducerCounter value={value}");
        let mut frame = Frame::text(format!("Reduced: {value}"));
        for (label, action) in [
            ("inc", CounterAction::Increment),
            ("dec", CounterAction::Decrement),
            ("double", CounterAction::Double),
            ("reset", CounterAction::Reset),
        ] {
            let dispatch = dispatch.clone();
            frame = frame.button(label, Callback::new(move |()| dispatch.dispatch(action)));
        }
        Ok(frame)
    })
}

#[derive(Debug, PartialEq, Eq)]
pub struct UserInfo {
    pub name: String,
    pub role: String,
}

impl UserInfo {
    pub fn new(name: &str, role: &str) -> Self {
        Self {
            name: name.to_string(),
            role: role.to_string(),
        }
    }

    pub fn guest() -> Self {
        Self::new("guest", "visitor")
    }
}

pub type UserContext = Context<Rc<UserInfo>>;

pub fn user_context() -> UserContext {
    create_context("UserInfo", || Rc::new(UserInfo::guest()))
}

/// Memoized consumer of the user context. Renders only when the provided
/// `Rc` changes.
pub fn profile(users: &UserContext) -> Component<(), Frame> {
    let users = users.clone();
    Component::new("Profile", move |scope: &mut Scope<'_>, _: &()| {
        let user = scope.use_context(&users);
        log::info!("render Profile user={}", user.name);
        Ok(Frame::text(format!("User: {} ({})", user.name, user.role)))
    })
    .memo()
}

/// Text input whose render count lives in a ref, so counting never renders.
pub fn render_counter() -> Component<(), Frame> {
    Component::new("RenderCounter", |scope: &mut Scope<'_>, _: &()| {
        let (text, set_text) = scope.use_state(String::new)?;
        let renders = scope.use_ref(|| 0u32)?;
        {
            let renders = renders.clone();
            scope.use_passive_effect(None, move || renders.update(|count| *count += 1))?;
        }

        let typed = Callback::new(move |()| set_text.update(|text| format!("{text}a")));
        let peek = {
            let renders = renders.clone();
            Callback::new(move |()| log::info!("ref holds {} committed renders", renders.get()))
        };
        Ok(
            Frame::text(format!("Input: {text:?} (rendered {} times before)", renders.get()))
                .button("type", typed)
                .button("peek", peek),
        )
    })
}

fn badge(name: &'static str) -> Component<(bool, Callback<()>), Frame> {
    Component::new(name, move |_: &mut Scope<'_>, props: &(bool, Callback<()>)| {
        log::info!("render {name} flag={}", props.0);
        Ok(Frame::text(format!("{name}: {}", props.0)).button("click", props.1.clone()))
    })
}

/// Where the click handler handed to the session badges comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handler {
    /// A fresh closure every render.
    Inline,
    UseCallback,
    UseMemo,
    UseRef,
}

impl Handler {
    fn label(self) -> &'static str {
        match self {
            Handler::Inline => "inline",
            Handler::UseCallback => "use_callback",
            Handler::UseMemo => "use_memo",
            Handler::UseRef => "use_ref",
        }
    }
}

/// Two badges under one parent sharing a click handler. The memoized badge
/// skips parent renders unless the handler is rebuilt on every render.
pub fn session() -> Component<(), Frame> {
    let memo = badge("Memo").memo();
    let plain = badge("NoMemo");
    Component::new("Session", move |scope: &mut Scope<'_>, _: &()| {
        let (ticks, set_ticks) = scope.use_state(|| 0u32)?;
        let (is_login, set_login) = scope.use_state(|| false)?;
        let (is_auth, set_auth) = scope.use_state(|| false)?;
        let (handler, set_handler) = scope.use_state(|| Handler::UseRef)?;
        log::info!("render Session ticks={ticks} handler={}", handler.label());

        let cached = scope.use_callback(deps![], |()| log::info!("clicked! with use_callback"))?;
        let memoized = scope.use_memo(deps![], || {
            Callback::new(|()| log::info!("clicked! with use_memo"))
        })?;
        let held = scope.use_ref(|| Callback::new(|()| log::info!("clicked! with use_ref")))?;
        let on_click = match handler {
            Handler::Inline => Callback::new(|()| log::info!("clicked!")),
            Handler::UseCallback => cached,
            Handler::UseMemo => (*memoized).clone(),
            Handler::UseRef => held.get(),
        };
        scope.child(&memo, (is_login, on_click.clone()));
        scope.child(&plain, (is_auth, on_click));

        let mut frame = Frame::text(format!("Session ticks: {ticks} ({})", handler.label()))
            .button("tick", Callback::new(move |()| set_ticks.update(|t| t + 1)))
            .button("login", Callback::new(move |()| set_login.update(|v| !v)))
            .button("auth", Callback::new(move |()| set_auth.update(|v| !v)));
        for choice in [
            Handler::Inline,
            Handler::UseCallback,
            Handler::UseMemo,
            Handler::UseRef,
        ] {
            let set_handler = set_handler.clone();
            frame = frame.button(
                choice.label(),
                Callback::new(move |()| set_handler.set(choice)),
            );
        }
        Ok(frame)
    })
}

const CLASSIC: &[&str] = &["Pathetique", "Moonlight", "Fur Elise"];
const JAZZ: &[&str] = &["So What", "Take Five"];

pub fn tracks_for(genre: &str) -> Vec<&'static str> {
    match genre {
        "classic" => CLASSIC.to_vec(),
        _ => JAZZ.to_vec(),
    }
}

/// Memoized track list, memoized genre switch and a stable `later` button
/// that reads the latest volume through a ref.
pub fn playlist() -> Component<(), Frame> {
    Component::new("Playlist", |scope: &mut Scope<'_>, _: &()| {
        let (genre, set_genre) = scope.use_state(|| "classic")?;
        let (volume, set_volume) = scope.use_state(|| 5u8)?;
        let (message, set_message) = scope.use_state(String::new)?;
        log::info!("render Playlist genre={genre} volume={volume}");

        let tracks = scope.use_memo(deps![genre], || {
            log::info!("loading {genre} tracks");
            tracks_for(genre)
        })?;
        let switch = scope.use_callback(deps![genre], move |()| {
            set_genre.set(if genre == "classic" { "jazz" } else { "classic" })
        })?;

        let announce = scope.use_ref(|| None::<Callback<(), String>>)?;
        {
            let announce = announce.clone();
            let latest = Callback::new(move |()| format!("now playing at volume {volume}"));
            scope.use_layout_effect(None, move || {
                announce.replace(Some(latest));
            })?;
        }
        let later = scope.use_callback(deps![], move |()| {
            if let Some(latest) = announce.get() {
                set_message.set(latest.call(()));
            }
        })?;

        Ok(Frame::text(format!(
            "{genre}: {} | volume {volume} | {message}",
            tracks.join(", ")
        ))
        .button("switch", switch)
        .button("louder", Callback::new(move |()| set_volume.update(|v| v + 1)))
        .button("later", later))
    })
}

/// Root of the tour. Provides the signed-in user to [`profile`].
pub fn tour_app() -> Component<(), Frame> {
    let users = user_context();
    let counter = counter();
    let reducer = reducer_counter();
    let profile = profile(&users);
    let render_counter = render_counter();
    let session = session();
    let playlist = playlist();
    Component::new("TourApp", move |scope: &mut Scope<'_>, _: &()| {
        let (signed_in, set_signed_in) = scope.use_state(|| false)?;
        let user = scope.use_memo(deps![signed_in], || {
            if signed_in {
                UserInfo::new("taro", "admin")
            } else {
                UserInfo::guest()
            }
        })?;
        scope.provide_context(&users, user);

        scope.child(&counter, ());
        scope.child(&reducer, ());
        scope.child(&profile, ());
        scope.child(&render_counter, ());
        scope.child(&session, ());
        scope.child(&playlist, ());

        let label = if signed_in { "sign out" } else { "sign in" };
        Ok(Frame::text("Hooks tour")
            .button(label, Callback::new(move |()| set_signed_in.update(|v| !v))))
    })
}

#[cfg(test)]
#[path = "tests/app_tests.rs"]
mod tests;
