use msgscript::{
    binary,
    compiler::{compile_source, CompilerOptions},
    decompiler::Decompiler,
    diagnostics::CollectSink,
    library::{FunctionLibrary, LibraryFunction, MessageLibrary},
    model::{
        DialogueWindow, FormatVersion, Line, MessageScript, SelectionWindow, Speaker, Token,
        Window,
    },
};

fn dialogue(
    identifier: &str,
    speaker: Option<Speaker>,
    lines: Vec<Line>,
) -> Window {
    let mut window = DialogueWindow::new(identifier);
    window.speaker = speaker;
    window.lines = lines;
    Window::Dialogue(window)
}

fn selection(identifier: &str, lines: Vec<Line>) -> Window {
    let mut window = SelectionWindow::new(identifier);
    window.lines = lines;
    Window::Selection(window)
}

/// Scripts shaped like real conversation data: named, variable and absent
/// speakers, empty lines, multi-argument function tokens, selections.
fn sample_scripts(version: FormatVersion) -> Vec<MessageScript> {
    let mut plain = MessageScript::new(0, version);
    plain.windows.push(dialogue("intro", None, vec![Line::default()]));
    plain.windows.push(dialogue("placeholder", None, vec![]));

    let mut conversation = MessageScript::new(0, version);

    conversation.windows.push(dialogue(
        "greet_elder",
        Some(Speaker::Named(Line::new(vec![Token::text(*b"Elder")]))),
        vec![
            Line::new(vec![
                Token::text(*b"Welcome home."),
                Token::function(1, 1, vec![]),
            ]),
            Line::new(vec![Token::function(2, 1, vec![4, -1, 300])]),
        ],
    ));

    conversation.windows.push(dialogue(
        "greet_reply",
        Some(Speaker::VariableIndex(3)),
        vec![Line::new(vec![Token::text(*b"And you.")])],
    ));

    conversation.windows.push(dialogue(
        "tagged_speaker",
        Some(Speaker::Named(Line::new(vec![
            Token::text(*b"Bob"),
            Token::function(1, 2, vec![]),
        ]))),
        vec![Line::new(vec![Token::text(*b"...")])],
    ));

    conversation.windows.push(selection(
        "stay_or_go",
        vec![
            Line::new(vec![Token::text(*b"Stay")]),
            Line::new(vec![Token::text(*b"Go")]),
        ],
    ));

    vec![plain, conversation]
}

fn decompile_to_string(script: &MessageScript, library: Option<&FunctionLibrary>) -> String {
    let mut out = Vec::new();

    {
        let mut decompiler = Decompiler::new(&mut out);

        if let Some(library) = library {
            decompiler = decompiler.with_library(library);
        }

        decompiler.decompile(script).unwrap();
    }

    String::from_utf8(out).unwrap()
}

#[test]
fn script_reencode_symmetry() {
    for version in [FormatVersion::Version1, FormatVersion::Version1BigEndian] {
        for script in sample_scripts(version) {
            let encoded = binary::encode_script(&script).unwrap();
            let decoded = binary::decode_script(&encoded).unwrap();

            assert_eq!(decoded, script);

            let reencoded = binary::encode_script(&decoded).unwrap();
            assert_eq!(reencoded, encoded);
        }
    }
}

#[test]
fn script_reencode_preserves_opaque_fields() {
    let mut script = MessageScript::new(9, FormatVersion::Version1);
    script.reserved.field_0c = 0x11223344;
    script.reserved.field_1e = -5;
    script.reserved.speaker_field_08 = 7;

    let mut choice = SelectionWindow::new("choice");
    choice.field_18 = 2;
    choice.field_1c = -1;
    choice.field_1e = 258;
    choice.lines.push(Line::new(vec![Token::text(*b"Ok")]));
    script.windows.push(Window::Selection(choice));

    let decoded = binary::decode_script(&binary::encode_script(&script).unwrap()).unwrap();

    assert_eq!(decoded, script);
}

#[test]
fn line_token_symmetry() {
    let lines = [
        Line::default(),
        Line::new(vec![Token::text(*b"plain words")]),
        Line::new(vec![Token::function(7, 31, vec![i16::MIN, i16::MAX, 0])]),
        Line::new(vec![
            Token::text(*b"a"),
            Token::function(0, 0, vec![255, 256, -256]),
            Token::text(*b"b"),
        ]),
    ];

    for line in &lines {
        let encoded = binary::encode_line(line).unwrap();
        let decoded = binary::decode_line(&encoded).unwrap();

        assert_eq!(&decoded, line);
    }
}

#[test]
fn script_recompile_symmetry() {
    /* decompile then recompile must reproduce the lifted model exactly,
     * and therefore the container bytes too */

    for script in sample_scripts(FormatVersion::Version1) {
        let encoded = binary::encode_script(&script).unwrap();
        let decoded = binary::decode_script(&encoded).unwrap();

        let source = decompile_to_string(&decoded, None);

        let mut sink = CollectSink::new();
        let recompiled =
            compile_source(&source, &CompilerOptions::default(), &mut sink).unwrap();

        assert_eq!(recompiled, decoded, "source was:\n{source}");
        assert_eq!(binary::encode_script(&recompiled).unwrap(), encoded);
    }
}

#[test]
fn script_recompile_symmetry_with_library() {
    let library = FunctionLibrary::new(vec![MessageLibrary {
        name: "Window".to_string(),
        index: 1,
        functions: vec![
            LibraryFunction {
                name: "wait_input".to_string(),
                index: 1,
                parameters: vec![],
            },
            LibraryFunction {
                name: "emote".to_string(),
                index: 2,
                parameters: vec![],
            },
        ],
    }]);

    for script in sample_scripts(FormatVersion::Version1) {
        let decoded =
            binary::decode_script(&binary::encode_script(&script).unwrap()).unwrap();

        let source = decompile_to_string(&decoded, Some(&library));

        let opts = CompilerOptions {
            library: Some(&library),
            ..CompilerOptions::default()
        };

        let mut sink = CollectSink::new();
        let recompiled = compile_source(&source, &opts, &mut sink).unwrap();

        assert_eq!(recompiled, decoded, "source was:\n{source}");
    }
}

#[test]
fn escaped_text_keeps_container_bytes() {
    /* embedded newlines and two-byte characters decompile into [n] and
     * [x ..]; the model differs after recompiling but the bytes must not */

    let mut script = MessageScript::new(0, FormatVersion::Version1);
    script.windows.push(dialogue(
        "mixed",
        None,
        vec![Line::new(vec![Token::text(vec![
            0x48, 0x6D, 0x0A, 0x81, 0x40, 0x21,
        ])])],
    ));

    let encoded = binary::encode_script(&script).unwrap();
    let decoded = binary::decode_script(&encoded).unwrap();

    let source = decompile_to_string(&decoded, None);
    assert!(source.is_ascii());

    let mut sink = CollectSink::new();
    let recompiled = compile_source(&source, &CompilerOptions::default(), &mut sink).unwrap();

    assert_eq!(binary::encode_script(&recompiled).unwrap(), encoded);
}
