pub mod error;
pub mod tree;

/// Program context available while formatting.
pub struct Context<'src> {
    /// Source text, used to turn spans into line and column numbers.
    pub src: &'src str,
}

/// Analogous to [`std::fmt::Display`], but also contains the program context,
/// such as the source text.
pub trait Show {
    fn show(&self, f: &mut std::fmt::Formatter<'_>, ctx: &Context<'_>) -> std::fmt::Result;

    /// Returns a type which can be displayed.
    fn display<'a>(&'a self, ctx: &'a Context<'_>) -> impl std::fmt::Display + 'a
    where
        Self: Sized,
    {
        Display(self, ctx)
    }
}

struct Display<'this, 'ctx, 'src, T: Show>(pub &'this T, pub &'ctx Context<'src>);

impl<T> std::fmt::Display for Display<'_, '_, '_, T>
where
    T: Show,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Display(this, ctx) = self;
        this.show(f, ctx)
    }
}
