//! native bevy_ui front-end for bevy_travel_llm.
//! - one button per preset; clicking streams a place recommendation.
//! - origin / destination text fields (tab switches focus, enter submits).
//! - maps can't be embedded natively, so the map frame shows its url (key stripped).
//!
//! env:
//!   GEMINI_API_KEY       (required)
//!   TRAVEL_MODEL         (default gemini-2.5-flash)
//!   TRAVEL_TEMPERATURE   (default 2.0)
//!   TRAVEL_COLOR_SCHEME  (light | dark)

use bevy::input::keyboard::{KeyCode, KeyboardInput};
use bevy::prelude::*;
use bevy_travel_llm::{
    ColorScheme, DirectionsForm, DirectionsSubmitted, DisplaySurfaces, PresetPressed, Presets, Theme,
    TravelConfig, TravelPlugin, TravelServices, TravelSet, TravelUiPlugin, map::without_key,
};

// ---------------------- ui tags ----------------------

#[derive(Component, Copy, Clone)]
struct PresetButton(usize);
#[derive(Component)]
struct BtnDirections;

#[derive(Component)]
struct OriginText;
#[derive(Component)]
struct DestinationText;
#[derive(Component)]
struct CaptionText;
#[derive(Component)]
struct DirectionsText;
#[derive(Component)]
struct MapText;

#[derive(Resource, Default, Clone, Copy, PartialEq, Eq, Debug)]
enum Focus {
    #[default]
    Origin,
    Destination,
}

// ---------------------- main ----------------------

fn main() {
    let config = TravelConfig::from_env().expect("GEMINI_API_KEY must be set");

    App::new()
        .insert_resource(TravelServices::from_config(&config))
        .insert_resource(config)
        .insert_resource(Focus::default())
        .add_plugins(DefaultPlugins)
        .add_plugins((TravelPlugin, TravelUiPlugin))
        // PostStartup: the theme is inserted by TravelUiPlugin in Startup
        .add_systems(PostStartup, setup)
        .add_systems(Update, (handle_text_input, btn_presets, btn_directions, refresh_form_texts))
        .add_systems(Update, refresh_surface_texts.after(TravelSet::Drain))
        .run();
}

// ---------------------- colors ----------------------

struct Palette {
    clear: Color,
    text: Color,
    muted: Color,
    button: Color,
    hovered: Color,
    pressed: Color,
}

fn palette(scheme: ColorScheme) -> Palette {
    match scheme {
        ColorScheme::Light => Palette {
            clear: Color::srgb_u8(244, 244, 240),
            text: Color::srgb_u8(20, 20, 24),
            muted: Color::srgb_u8(90, 90, 96),
            button: Color::srgb(0.82, 0.82, 0.86),
            hovered: Color::srgb(0.76, 0.76, 0.82),
            pressed: Color::srgb(0.7, 0.7, 0.76),
        },
        ColorScheme::Dark => Palette {
            clear: Color::srgb_u8(18, 18, 20),
            text: Color::WHITE,
            muted: Color::srgb_u8(170, 170, 176),
            button: Color::srgb(0.2, 0.2, 0.25),
            hovered: Color::srgb(0.25, 0.25, 0.3),
            pressed: Color::srgb(0.3, 0.3, 0.35),
        },
    }
}

// ---------------------- setup ui ----------------------

fn button_node(width: f32) -> Node {
    Node {
        width: Val::Px(width),
        height: Val::Px(28.0),
        align_items: AlignItems::Center,
        justify_content: JustifyContent::Center,
        ..default()
    }
}

fn setup(mut commands: Commands, theme: Res<Theme>, presets: Res<Presets>) {
    let colors = palette(theme.0);
    commands.insert_resource(ClearColor(colors.clear));
    commands.spawn(Camera2d);

    let style_18 = TextFont { font_size: 18.0, ..default() };
    let style_14 = TextFont { font_size: 14.0, ..default() };

    commands
        .spawn((
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                row_gap: Val::Px(10.0),
                padding: UiRect::all(Val::Px(12.0)),
                ..default()
            },
            BackgroundColor(Color::NONE),
        ))
        .with_children(|p| {
            // --- presets ---
            p.spawn((
                Node {
                    width: Val::Percent(100.0),
                    flex_direction: FlexDirection::Row,
                    flex_wrap: FlexWrap::Wrap,
                    column_gap: Val::Px(8.0),
                    row_gap: Val::Px(8.0),
                    ..default()
                },
                BackgroundColor(Color::NONE),
            ))
            .with_children(|row| {
                for (i, preset) in presets.0.iter().enumerate() {
                    row.spawn((Button, button_node(170.0), BackgroundColor(colors.button), PresetButton(i)))
                        .with_children(|b| {
                            b.spawn((Text::new(preset.label), style_14.clone(), TextColor(colors.text)));
                        });
                }
            });

            // --- directions form ---
            p.spawn((Text::new(""), style_14.clone(), TextColor(colors.text), OriginText));
            p.spawn((Text::new(""), style_14.clone(), TextColor(colors.text), DestinationText));
            p.spawn((Button, button_node(150.0), BackgroundColor(colors.button), BtnDirections))
                .with_children(|b| {
                    b.spawn((Text::new("get directions"), style_14.clone(), TextColor(colors.text)));
                });

            // --- surfaces ---
            p.spawn((Text::new(""), style_18.clone(), TextColor(colors.text), CaptionText));
            p.spawn((Text::new(""), style_18.clone(), TextColor(colors.text), DirectionsText));
            p.spawn((Text::new(""), style_14.clone(), TextColor(colors.muted), MapText));
        });
}

// ---------------------- input & buttons ----------------------

fn handle_text_input(
    mut ev_kbd: EventReader<KeyboardInput>,
    keys: Res<ButtonInput<KeyCode>>,
    mut focus: ResMut<Focus>,
    mut form: ResMut<DirectionsForm>,
    mut ev_submit: EventWriter<DirectionsSubmitted>,
) {
    if keys.just_pressed(KeyCode::Tab) {
        *focus = match *focus {
            Focus::Origin => Focus::Destination,
            Focus::Destination => Focus::Origin,
        };
        info!(target: "travel", "focus -> {:?}", *focus);
    }

    for ev in ev_kbd.read() {
        if ev.state.is_pressed() {
            if let Some(txt) = &ev.text {
                let s: String = txt.chars().filter(|c| !c.is_control()).collect();
                match *focus {
                    Focus::Origin => form.origin.push_str(&s),
                    Focus::Destination => form.destination.push_str(&s),
                }
            }
        }
    }

    if keys.just_pressed(KeyCode::Backspace) {
        match *focus {
            Focus::Origin => form.origin.pop(),
            Focus::Destination => form.destination.pop(),
        };
    }

    if keys.just_pressed(KeyCode::Enter) {
        info!(target: "travel", "enter -> submit directions");
        ev_submit.write(DirectionsSubmitted);
    }
}

fn btn_presets(
    mut q: Query<(&Interaction, &PresetButton, &mut BackgroundColor), Changed<Interaction>>,
    theme: Res<Theme>,
    mut ev_preset: EventWriter<PresetPressed>,
) {
    let colors = palette(theme.0);
    for (i, PresetButton(index), mut bg) in &mut q {
        match *i {
            Interaction::Pressed => {
                bg.0 = colors.pressed;
                ev_preset.write(PresetPressed(*index));
            }
            Interaction::Hovered => bg.0 = colors.hovered,
            Interaction::None => bg.0 = colors.button,
        }
    }
}

fn btn_directions(
    mut q: Query<(&Interaction, &mut BackgroundColor), (Changed<Interaction>, With<BtnDirections>)>,
    theme: Res<Theme>,
    mut ev_submit: EventWriter<DirectionsSubmitted>,
) {
    let colors = palette(theme.0);
    for (i, mut bg) in &mut q {
        match *i {
            Interaction::Pressed => {
                bg.0 = colors.pressed;
                ev_submit.write(DirectionsSubmitted);
            }
            Interaction::Hovered => bg.0 = colors.hovered,
            Interaction::None => bg.0 = colors.button,
        }
    }
}

// ---------------------- text refresh ----------------------

fn refresh_form_texts(
    form: Res<DirectionsForm>,
    focus: Res<Focus>,
    mut sets: ParamSet<(
        Query<&mut Text, With<OriginText>>,
        Query<&mut Text, With<DestinationText>>,
    )>,
) {
    if !(form.is_changed() || focus.is_changed()) {
        return;
    }
    let caret = |f: Focus| if *focus == f { " |" } else { "" };
    if let Ok(mut t) = sets.p0().single_mut() {
        t.0 = format!("from: {}{}", form.origin, caret(Focus::Origin));
    }
    if let Ok(mut t) = sets.p1().single_mut() {
        t.0 = format!("to: {}{}", form.destination, caret(Focus::Destination));
    }
}

fn refresh_surface_texts(
    surfaces: Res<DisplaySurfaces>,
    mut sets: ParamSet<(
        Query<(&mut Text, &mut Visibility), With<CaptionText>>,
        Query<(&mut Text, &mut Visibility), With<DirectionsText>>,
        Query<&mut Text, With<MapText>>,
    )>,
) {
    if !surfaces.is_changed() {
        return;
    }
    let vis = |visible: bool| if visible { Visibility::Inherited } else { Visibility::Hidden };
    if let Ok((mut t, mut v)) = sets.p0().single_mut() {
        t.0 = surfaces.caption.text.clone();
        *v = vis(surfaces.caption.visible);
    }
    if let Ok((mut t, mut v)) = sets.p1().single_mut() {
        t.0 = surfaces.directions.text.clone();
        *v = vis(surfaces.directions.visible);
    }
    if let Ok(mut t) = sets.p2().single_mut() {
        t.0 = match &surfaces.map.src {
            Some(src) => format!("map: {}", without_key(src)),
            None => String::new(),
        };
    }
}
