pub(crate) mod styles;

pub(crate) const LOGO: &str = r"
 ____         _          ____ __  __ ____
|  _ \  __ _ | |_  ___  / ___|  \/  / ___|
| | | |/ _` || __|/ _ \| |   | |\/| \___ \
| |_| | (_| || |_| (_) | |___| |  | |___) |
|____/ \__,_| \__|\___/ \____|_|  |_|____/
";
