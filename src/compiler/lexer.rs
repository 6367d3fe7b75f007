use super::parser::Token;

use lexgen::lexer;

lexer! {
    pub Lexer -> Token;

    let dec_digit = ['0'-'9'];
    let hex_digit = $dec_digit | ['a'-'f' 'A'-'F'];

    /* '@' appears in library sentinel names like @Unused */
    let name_head = ['a'-'z' 'A'-'Z' '_' '@'];
    let name_tail = $name_head | $dec_digit;

    /* Text mode. A '[' opens a tag head; a ']' closes whatever bracketed
     * construct is pending, so bare brackets cannot appear in free text. */
    rule Init {
        '[' => |lexer| lexer.switch_and_return(LexerRule::Tag, Token::LBracket),

        ']' => |lexer| lexer.return_(Token::RBracket),

        (_ # ['[' ']'])+ =>
            |lexer| lexer.return_(Token::Text(String::from(lexer.match_()))),
    }

    /* Tag mode: the tag name and its arguments. A nested '[' opens a
     * sub-block whose content is text again (speaker blocks). */
    rule Tag {
        $$ascii_whitespace,

        '[' => |lexer| lexer.switch_and_return(LexerRule::Init, Token::LBracket),

        ']' => |lexer| lexer.switch_and_return(LexerRule::Init, Token::RBracket),

        $name_head $name_tail * =>
            |lexer| lexer.return_(Token::Ident(String::from(lexer.match_()))),

        /* integer literals stay as source text; the parser converts them,
         * since an oversized literal must fail as a diagnostic */
        '-' ? ($dec_digit + | "0x" $hex_digit +) =>
            |lexer| lexer.return_(Token::Int(String::from(lexer.match_()))),
    }
}
