/// Nasdaq-100 members at the time of the last table refresh, as
/// (Yahoo ticker, display name). Class shares use Yahoo's dash form.
pub(super) const NASDAQ_100: &[(&str, &str)] = &[
    ("AAPL", "Apple Inc."),
    ("ABNB", "Airbnb"),
    ("ADBE", "Adobe Inc."),
    ("ADI", "Analog Devices"),
    ("ADP", "Automatic Data Processing"),
    ("ADSK", "Autodesk"),
    ("AEP", "American Electric Power"),
    ("AMAT", "Applied Materials"),
    ("AMD", "Advanced Micro Devices"),
    ("AMGN", "Amgen"),
    ("AMZN", "Amazon"),
    ("ANSS", "Ansys"),
    ("APP", "AppLovin"),
    ("ARM", "Arm Holdings"),
    ("ASML", "ASML Holding"),
    ("AVGO", "Broadcom"),
    ("AXON", "Axon Enterprise"),
    ("AZN", "AstraZeneca"),
    ("BIIB", "Biogen"),
    ("BKNG", "Booking Holdings"),
    ("BKR", "Baker Hughes"),
    ("CCEP", "Coca-Cola Europacific Partners"),
    ("CDNS", "Cadence Design Systems"),
    ("CDW", "CDW Corporation"),
    ("CEG", "Constellation Energy"),
    ("CHTR", "Charter Communications"),
    ("CMCSA", "Comcast"),
    ("COST", "Costco"),
    ("CPRT", "Copart"),
    ("CRWD", "CrowdStrike"),
    ("CSCO", "Cisco"),
    ("CSGP", "CoStar Group"),
    ("CSX", "CSX Corporation"),
    ("CTAS", "Cintas"),
    ("CTSH", "Cognizant"),
    ("DASH", "DoorDash"),
    ("DDOG", "Datadog"),
    ("DXCM", "DexCom"),
    ("EA", "Electronic Arts"),
    ("EXC", "Exelon"),
    ("FANG", "Diamondback Energy"),
    ("FAST", "Fastenal"),
    ("FTNT", "Fortinet"),
    ("GEHC", "GE HealthCare"),
    ("GFS", "GlobalFoundries"),
    ("GILD", "Gilead Sciences"),
    ("GOOG", "Alphabet Inc. (Class C)"),
    ("GOOGL", "Alphabet Inc. (Class A)"),
    ("HON", "Honeywell"),
    ("IDXX", "Idexx Laboratories"),
    ("INTC", "Intel"),
    ("INTU", "Intuit"),
    ("ISRG", "Intuitive Surgical"),
    ("KDP", "Keurig Dr Pepper"),
    ("KHC", "Kraft Heinz"),
    ("KLAC", "KLA Corporation"),
    ("LIN", "Linde plc"),
    ("LRCX", "Lam Research"),
    ("LULU", "Lululemon Athletica"),
    ("MAR", "Marriott International"),
    ("MCHP", "Microchip Technology"),
    ("MDLZ", "Mondelez International"),
    ("MELI", "MercadoLibre"),
    ("META", "Meta Platforms"),
    ("MNST", "Monster Beverage"),
    ("MRVL", "Marvell Technology"),
    ("MSFT", "Microsoft"),
    ("MSTR", "Strategy"),
    ("MU", "Micron Technology"),
    ("NFLX", "Netflix"),
    ("NVDA", "Nvidia"),
    ("NXPI", "NXP Semiconductors"),
    ("ODFL", "Old Dominion Freight Line"),
    ("ON", "ON Semiconductor"),
    ("ORLY", "O'Reilly Automotive"),
    ("PANW", "Palo Alto Networks"),
    ("PAYX", "Paychex"),
    ("PCAR", "Paccar"),
    ("PDD", "PDD Holdings"),
    ("PEP", "PepsiCo"),
    ("PLTR", "Palantir Technologies"),
    ("PYPL", "PayPal"),
    ("QCOM", "Qualcomm"),
    ("REGN", "Regeneron Pharmaceuticals"),
    ("ROP", "Roper Technologies"),
    ("ROST", "Ross Stores"),
    ("SBUX", "Starbucks"),
    ("SNPS", "Synopsys"),
    ("TEAM", "Atlassian"),
    ("TMUS", "T-Mobile US"),
    ("TSLA", "Tesla, Inc."),
    ("TTD", "The Trade Desk"),
    ("TTWO", "Take-Two Interactive"),
    ("TXN", "Texas Instruments"),
    ("VRSK", "Verisk Analytics"),
    ("VRTX", "Vertex Pharmaceuticals"),
    ("WBD", "Warner Bros. Discovery"),
    ("WDAY", "Workday, Inc."),
    ("XEL", "Xcel Energy"),
    ("ZS", "Zscaler"),
];
