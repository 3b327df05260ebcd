#[macro_export]
macro_rules! jms_commands {
    ( $( $variant:ident ($ty:ty) ),+ $(,)? ) => {
        #[derive(clap::Subcommand, Debug)]
        pub enum Commands {
            $(
                #[command(
                    aliases = <$ty as $crate::common::CommandMetadata>::aliases(),
                    visible_aliases = <$ty as $crate::common::CommandMetadata>::visible_aliases(),
                    about = <$ty as $crate::common::CommandMetadata>::about(),
                    long_about = <$ty as $crate::common::CommandMetadata>::long_about(),
                    hide = <$ty as $crate::common::CommandMetadata>::hide(),
                )]
                $variant($ty),
            )+
        }

        impl $crate::JmsCommand for Commands {
            fn run(&self) -> anyhow::Result<()> {
                match self {
                    $(
                        Commands::$variant(inner) => inner.run(),
                    )+
                }
            }
        }
    };
}

pub(crate) use jms_commands;
